//! oauth-client - Login with GitHub and list your repositories
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - GET /, GET /authorize, POST /logout                      │
//! │  - /health, /metrics                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      OAuth Flow                              │
//! │  - CSRF state, code exchange, repo listing                  │
//! │  - Server-side sessions (moka)                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      GitHub (reqwest)                        │
//! │  - github.com/login/oauth, api.github.com                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `auth`: OAuth flow, sessions and routes
//! - `github`: GitHub HTTP client
//! - `views`: HTML rendering
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod metrics;
pub mod views;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Server-side browser sessions
    pub sessions: Arc<auth::SessionStore>,

    /// OAuth flow bound to the GitHub client
    pub oauth: Arc<auth::OAuthFlow>,
}

impl AppState {
    /// Initialize application state with the real GitHub client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let github = github::GitHubClient::new(&config.github)?;
        Ok(Self::with_github(config, Arc::new(github)))
    }

    /// Initialize application state with a caller-supplied GitHub backend
    pub fn with_github(config: config::AppConfig, github: Arc<dyn github::GitHubApi>) -> Self {
        tracing::info!("Initializing application state...");

        let sessions = auth::SessionStore::new(&config);
        let oauth = auth::OAuthFlow::new(config.github.clone(), github);

        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            oauth: Arc::new(oauth),
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use axum::routing::get;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(health_check))
        .merge(auth::auth_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .route("/metrics", get(metrics_handler))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Returns all metrics in Prometheus text format.
async fn metrics_handler() -> axum::response::Response {
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = metrics::REGISTRY.gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}
