//! GitHub OAuth and REST API access
//!
//! - [`types`]: wire types for the token endpoint and repository listing
//! - [`client`]: `reqwest`-backed [`GitHubClient`]

mod client;
mod types;

use async_trait::async_trait;

use crate::error::AppError;

pub use client::GitHubClient;
pub use types::{AccessTokenResponse, Repository};

/// Outbound GitHub calls made by the OAuth flow
///
/// Implemented by [`GitHubClient`]; handlers depend on the trait so the flow
/// can be exercised without a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    /// `AppError::TokenExchange` for any non-success status or a body without
    /// `access_token`; `AppError::HttpClient` on transport failure.
    async fn exchange_code(&self, code: &str) -> Result<String, AppError>;

    /// List the authenticated user's repositories, newest first.
    ///
    /// # Errors
    /// `AppError::TokenRevoked` when GitHub answers 401.
    async fn list_repos(&self, access_token: &str) -> Result<Vec<Repository>, AppError>;
}
