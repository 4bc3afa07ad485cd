//! Server-side session management
//!
//! Session data lives in an in-memory cache keyed by a random id.
//! The browser only holds the id, HMAC-signed so forged ids are ignored.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use moka::future::Cache;
use moka::notification::RemovalCause;
use rand::RngCore;
use sha2::Sha256;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const SESSION_ID_BYTES: usize = 32;

/// OAuth data held for one browser session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthSession {
    /// CSRF state sent on the last authorize redirect
    pub state: Option<String>,
    /// GitHub bearer token, set only after a verified callback
    pub access_token: Option<String>,
}

impl OAuthSession {
    /// Stored token, treating a blank value as absent
    pub fn access_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }
}

/// A session loaded for the duration of one request
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    pub data: OAuthSession,
    original: OAuthSession,
    is_new: bool,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn is_dirty(&self) -> bool {
        self.data != self.original
    }
}

/// In-memory session store
///
/// Idle sessions expire after `session.max_age_seconds`; at most
/// `session.max_entries` are held at once.
pub struct SessionStore {
    sessions: Cache<String, OAuthSession>,
    secret: String,
    cookie_name: String,
    secure_cookies: bool,
}

impl SessionStore {
    /// Create a store using the session settings from configuration
    pub fn new(config: &AppConfig) -> Self {
        let sessions = Cache::builder()
            .max_capacity(config.session.max_entries)
            .time_to_idle(Duration::from_secs(config.session.max_age_seconds as u64))
            .eviction_listener(|_key, _value, cause| {
                if !matches!(cause, RemovalCause::Replaced) {
                    crate::metrics::SESSIONS_ACTIVE.dec();
                }
            })
            .build();

        Self {
            sessions,
            secret: config.session.secret.clone(),
            cookie_name: config.session.cookie_name.clone(),
            secure_cookies: config.should_use_secure_cookies(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Load the session named by the request cookie, or start a new one
    ///
    /// A missing, forged, or expired cookie yields a fresh empty session.
    pub async fn load(&self, jar: &CookieJar) -> SessionHandle {
        let existing = jar
            .get(&self.cookie_name)
            .and_then(|cookie| verify_session_cookie(cookie.value(), &self.secret));

        if let Some(id) = existing {
            if let Some(data) = self.sessions.get(&id).await {
                return SessionHandle {
                    id,
                    original: data.clone(),
                    data,
                    is_new: false,
                };
            }
            tracing::debug!("Session cookie refers to an expired session");
        }

        SessionHandle {
            id: generate_session_id(),
            data: OAuthSession::default(),
            original: OAuthSession::default(),
            is_new: true,
        }
    }

    /// Persist a modified session and issue the cookie for new ones
    ///
    /// # Errors
    /// Returns error if the session id cannot be signed
    pub async fn commit(
        &self,
        handle: SessionHandle,
        jar: CookieJar,
    ) -> Result<CookieJar, AppError> {
        if !handle.is_dirty() {
            return Ok(jar);
        }

        if !handle.is_new {
            self.sessions.insert(handle.id, handle.data).await;
            return Ok(jar);
        }

        let value = sign_session_id(&handle.id, &self.secret)?;
        self.sessions.insert(handle.id, handle.data).await;
        crate::metrics::SESSIONS_ACTIVE.inc();

        Ok(jar.add(self.build_cookie(value)))
    }

    /// Drop the server-side session and expire the cookie
    pub async fn destroy(&self, jar: CookieJar) -> CookieJar {
        let existing = jar
            .get(&self.cookie_name)
            .and_then(|cookie| verify_session_cookie(cookie.value(), &self.secret));
        if let Some(id) = existing {
            self.sessions.invalidate(&id).await;
        }

        let mut removal = self.build_cookie(String::new());
        removal.make_removal();
        jar.add(removal)
    }

    /// Read a session by its signed cookie value
    pub async fn peek(&self, cookie_value: &str) -> Option<OAuthSession> {
        let id = verify_session_cookie(cookie_value, &self.secret)?;
        self.sessions.get(&id).await
    }

    fn build_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .build()
    }
}

fn generate_session_id() -> String {
    let mut bytes = [0_u8; SESSION_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Sign a session id
///
/// Cookie format: `{id}.base64(hmac_sha256(id))`
pub fn sign_session_id(id: &str, secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session key: {e}")))?;
    mac.update(id.as_bytes());
    let signature = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        id,
        general_purpose::URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verify a signed cookie value and return the session id
pub fn verify_session_cookie(value: &str, secret: &str) -> Option<String> {
    let (id, signature_b64) = value.split_once('.')?;
    if id.is_empty() {
        return None;
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(id.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(id.to_string())
}
