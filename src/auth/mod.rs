//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow
//! - Session management

pub mod flow;
mod oauth;
pub mod session;

pub use flow::{Landing, OAuthFlow};
pub use oauth::auth_router;
pub use session::{OAuthSession, SessionStore};
