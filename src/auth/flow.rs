//! OAuth 2.0 authorization code flow against GitHub
//!
//! Per-session state machine:
//!
//! ```text
//! NoToken --initiate--> AwaitingCallback --valid state + exchange--> Authenticated
//!    ^                                                                    |
//!    +---------------------------- 401 from API --------------------------+
//! ```

use rand::RngCore;
use std::sync::Arc;
use url::Url;

use super::session::OAuthSession;
use crate::config::GitHubConfig;
use crate::error::AppError;
use crate::github::{GitHubApi, Repository};

const STATE_BYTES: usize = 16;

/// Result of visiting the landing page
#[derive(Debug, PartialEq, Eq)]
pub enum Landing {
    /// Send the browser to GitHub's authorize page
    Authorize(String),
    /// Signed in; render these repositories
    Repos(Vec<Repository>),
}

/// OAuth flow and repository listing for one GitHub OAuth App
pub struct OAuthFlow {
    config: GitHubConfig,
    github: Arc<dyn GitHubApi>,
}

impl OAuthFlow {
    pub fn new(config: GitHubConfig, github: Arc<dyn GitHubApi>) -> Self {
        Self { config, github }
    }

    /// Start a login
    ///
    /// Stores a fresh state token in the session and returns the authorize
    /// URL carrying it.
    ///
    /// # Errors
    /// Returns error if `github.authorize_url` is not a valid URL
    pub fn initiate(&self, session: &mut OAuthSession) -> Result<String, AppError> {
        let state = generate_state();
        let location = self.authorize_url(&state)?;
        session.state = Some(state);

        crate::metrics::LOGINS_STARTED_TOTAL.inc();
        tracing::info!("Redirecting to GitHub for authorization");

        Ok(location)
    }

    /// Complete a login from GitHub's redirect
    ///
    /// The exchange is only attempted when `state` equals the value stored
    /// by [`OAuthFlow::initiate`]. A successful callback consumes the state.
    ///
    /// # Errors
    /// - `AppError::StateMismatch` if the state is missing or differs
    /// - Any error from the token exchange
    pub async fn handle_callback(
        &self,
        session: &mut OAuthSession,
        code: &str,
        state: &str,
    ) -> Result<(), AppError> {
        use crate::metrics::CALLBACKS_TOTAL;

        if session.state.as_deref() != Some(state) {
            CALLBACKS_TOTAL.with_label_values(&["state_mismatch"]).inc();
            return Err(AppError::StateMismatch);
        }

        let access_token = match self.github.exchange_code(code).await {
            Ok(token) => token,
            Err(error) => {
                CALLBACKS_TOTAL.with_label_values(&["exchange_failed"]).inc();
                return Err(error);
            }
        };

        session.access_token = Some(access_token);
        session.state = None;
        CALLBACKS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!("GitHub authorization completed");

        Ok(())
    }

    /// Landing page
    ///
    /// Lists repositories when signed in. Without a token, or when GitHub
    /// rejects the stored one, starts a new login instead.
    ///
    /// # Errors
    /// Any GitHub failure other than a rejected token
    pub async fn show(&self, session: &mut OAuthSession) -> Result<Landing, AppError> {
        let Some(access_token) = session.access_token() else {
            return self.initiate(session).map(Landing::Authorize);
        };

        let listing = self.github.list_repos(access_token).await;
        match listing {
            Ok(repos) => {
                tracing::debug!(count = repos.len(), "Fetched repositories");
                Ok(Landing::Repos(repos))
            }
            Err(AppError::TokenRevoked) => {
                tracing::info!("Stored access token was rejected; restarting login");
                session.access_token = None;
                self.initiate(session).map(Landing::Authorize)
            }
            Err(error) => Err(error),
        }
    }

    fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AppError::Config(format!("github.authorize_url is invalid: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_url", &self.config.authorize_redirect_url)
            .append_pair("scope", &self.config.scope)
            .append_pair("state", state);
        Ok(url.into())
    }
}

/// 16 random bytes, hex encoded
fn generate_state() -> String {
    let mut bytes = [0_u8; STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
