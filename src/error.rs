//! Error types for oauth-client
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` by rendering the error view.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Callback `state` did not match the session (400)
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Code-for-token exchange was rejected (502)
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// GitHub rejected the stored access token (401)
    #[error("Access token rejected by GitHub")]
    TokenRevoked,

    /// GitHub API returned an unexpected status (502)
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::StateMismatch => (StatusCode::BAD_REQUEST, "state_mismatch"),
            AppError::TokenExchange(_) => (StatusCode::BAD_GATEWAY, "token_exchange"),
            AppError::TokenRevoked => (StatusCode::UNAUTHORIZED, "token_revoked"),
            AppError::GitHubApi(_) => (StatusCode::BAD_GATEWAY, "github_api"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "http_client"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    /// Message safe to show in the browser
    fn public_message(&self) -> &'static str {
        match self {
            AppError::StateMismatch => "The login request could not be verified. Please try again.",
            AppError::TokenExchange(_) => "GitHub did not accept the login. Please try again.",
            AppError::TokenRevoked => "Your GitHub authorization has expired.",
            AppError::GitHubApi(_) | AppError::HttpClient(_) => {
                "GitHub could not be reached. Please try again later."
            }
            AppError::Config(_) | AppError::Internal(_) => "Something went wrong.",
        }
    }
}

impl IntoResponse for AppError {
    /// Render the error view with a status matching the variant
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        } else {
            tracing::warn!(error = %self, error_type, "Request rejected");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = crate::views::render_error(self.public_message());
        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
