//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::net::IpAddr;

use crate::error::AppError;

/// Hyphenated spellings accepted in config files, keyed by canonical name
const HYPHENATED_KEYS: [(&str, &str); 2] = [
    ("github.client_id", "github.client-id"),
    ("github.client_secret", "github.client-secret"),
];

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "localhost")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the application
    ///
    /// # Returns
    /// Full URL like "http://localhost"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// GitHub OAuth App credentials and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Browser-facing authorize endpoint
    pub authorize_url: String,
    /// Code-for-token exchange endpoint
    pub token_url: String,
    /// REST API base (no trailing slash)
    pub api_url: String,
    /// Space separated scopes requested at authorize time
    pub scope: String,
    /// Sent as `redirect_url` on the authorize redirect
    pub authorize_redirect_url: String,
    /// Sent as `redirect_uri` on the token exchange
    pub token_redirect_uri: String,
    /// Outbound request timeout in seconds
    pub timeout_seconds: u64,
}

/// Server-side session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC key for signing session cookies (32+ bytes)
    pub secret: String,
    /// Idle lifetime of a session in seconds (default: 86400)
    pub max_age_seconds: i64,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Upper bound on sessions held in memory (default: 10000)
    pub max_entries: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        format!("oauth_client={},tower_http=debug", self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (OAUTH_CLIENT__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, AppError> {
        let layered = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        Self::from_layers(layered)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, AppError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("github.authorize_url", "https://github.com/login/oauth/authorize")?
            .set_default("github.token_url", "https://github.com/login/oauth/access_token")?
            .set_default("github.api_url", "https://api.github.com")?
            .set_default("github.scope", "user public_repo")?
            .set_default("github.authorize_redirect_url", "http://localhost/authorize")?
            .set_default("github.token_redirect_uri", "http://localhost:8080/authorize")?
            .set_default("github.timeout_seconds", 30)?
            .set_default("session.max_age_seconds", 86400)?
            .set_default("session.cookie_name", "oauth_client_session")?
            .set_default("session.max_entries", 10_000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?)
    }

    /// Deserialize and validate merged sources
    ///
    /// A hyphenated key only fills its canonical key when no source set the
    /// canonical one, so `OAUTH_CLIENT__GITHUB__CLIENT_ID` still overrides
    /// `client-id` from a file.
    fn from_layers(layered: Config) -> Result<Self, AppError> {
        let mut builder = Config::builder().add_source(layered.clone());
        for (canonical, hyphenated) in HYPHENATED_KEYS {
            if let Ok(value) = layered.get_string(hyphenated) {
                builder = builder.set_default(canonical, value)?;
            }
        }

        let app_config: Self = builder
            .build()?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    fn validate(&self) -> Result<(), AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.github.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "github.client_id must not be empty".to_string(),
            ));
        }

        if self.github.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "github.client_secret must not be empty".to_string(),
            ));
        }

        if self.session.secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "session.secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.session.max_age_seconds <= 0 {
            return Err(AppError::Config(
                "session.max_age_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.max_entries == 0 {
            return Err(AppError::Config(
                "session.max_entries must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.to_ascii_lowercase().as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        if self.should_use_secure_cookies()
            && !self.server.protocol.eq_ignore_ascii_case("https")
        {
            return Err(AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix("OAUTH_CLIENT")
        .separator("__")
        .try_parsing(true)
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
