//! GitHub OAuth routes
//!
//! Binds the OAuth flow and session store to HTTP.

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::flow::Landing;
use crate::AppState;
use crate::error::AppError;
use crate::views;

/// Create authentication router
///
/// Routes:
/// - GET / - Repository list, or redirect to GitHub when signed out
/// - GET /authorize - OAuth callback
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing_page))
        .route("/authorize", get(github_callback))
        .route("/logout", post(logout))
}

/// `302 Found` to `location`
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// =============================================================================
// Landing Page
// =============================================================================

#[derive(Debug, Deserialize)]
struct LandingQuery {
    #[serde(default = "default_name")]
    name: String,
}

fn default_name() -> String {
    "World".to_string()
}

/// GET /
///
/// # Steps
/// 1. Load the browser's session
/// 2. Without a token, store a fresh state and redirect to GitHub
/// 3. With a token, fetch repositories and render them
#[tracing::instrument(skip_all)]
async fn landing_page(
    State(state): State<AppState>,
    Query(query): Query<LandingQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let mut session = state.sessions.load(&jar).await;
    let landing = state.oauth.show(&mut session.data).await;
    let jar = state.sessions.commit(session, jar).await?;

    match landing? {
        Landing::Authorize(location) => Ok((jar, found(&location)).into_response()),
        Landing::Repos(repos) => {
            Ok((jar, views::render_repos(&query.name, &repos)).into_response())
        }
    }
}

// =============================================================================
// GitHub OAuth Callback
// =============================================================================

/// Query parameters from GitHub callback
#[derive(Debug, Deserialize)]
struct GitHubCallbackQuery {
    /// Authorization code
    code: String,
    /// CSRF state token
    state: String,
}

/// GET /authorize
///
/// # Steps
/// 1. Verify CSRF state against the session
/// 2. Exchange code for access token
/// 3. Store token in session
/// 4. Redirect to home
#[tracing::instrument(skip_all)]
async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<GitHubCallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let mut session = state.sessions.load(&jar).await;
    state
        .oauth
        .handle_callback(&mut session.data, &query.code, &query.state)
        .await?;
    let jar = state.sessions.commit(session, jar).await?;

    Ok((jar, found("/")).into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Drops the session and redirects home, which starts a new login.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = state.sessions.destroy(jar).await;
    tracing::info!("Session destroyed");
    (jar, found("/"))
}
