//! Common test utilities for E2E tests

#![allow(dead_code)]

use oauth_client::{AppState, config};
use std::sync::Once;
use tokio::net::TcpListener;
use url::Url;
use wiremock::MockServer;

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const COOKIE_NAME: &str = "oauth_client_session";

static METRICS: Once = Once::new();

/// Test server instance
///
/// GitHub's token endpoint and REST API are served by `github`.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        METRICS.call_once(oauth_client::metrics::init_metrics);
        let github = MockServer::start().await;

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            github: config::GitHubConfig {
                client_id: CLIENT_ID.to_string(),
                client_secret: CLIENT_SECRET.to_string(),
                authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: format!("{}/login/oauth/access_token", github.uri()),
                api_url: github.uri(),
                scope: "user public_repo".to_string(),
                authorize_redirect_url: "http://localhost/authorize".to_string(),
                token_redirect_uri: "http://localhost:8080/authorize".to_string(),
                timeout_seconds: 10,
            },
            session: config::SessionConfig {
                secret: "test-secret-key-32-bytes-long!!!".to_string(),
                max_age_seconds: 3600,
                cookie_name: COOKIE_NAME.to_string(),
                max_entries: 1_000,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = oauth_client::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            github,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// GET `path`, sending the session cookie when given
    pub async fn get(&self, path: &str, session: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(value) = session {
            request = request.header("Cookie", format!("{}={}", COOKIE_NAME, value));
        }
        request.send().await.expect("request succeeds")
    }

    /// Visit `/` with no cookie and return `(session cookie, state)`
    pub async fn start_login(&self) -> (String, String) {
        let response = self.get("/", None).await;
        assert_eq!(response.status(), 302);

        let cookie = session_cookie(&response).expect("session cookie issued");
        let state = query_param(location(&response), "state").expect("state in redirect");
        (cookie, state)
    }

    /// Run a full login whose token exchange yields `access_token`
    ///
    /// The token endpoint mock must already be mounted.
    pub async fn login(&self) -> String {
        let (cookie, state) = self.start_login().await;
        let response = self
            .get(&format!("/authorize?code=abc&state={state}"), Some(&cookie))
            .await;
        assert_eq!(response.status(), 302);
        assert_eq!(location(&response), "/");
        cookie
    }

    /// Server-side session for a cookie value
    pub async fn session(&self, cookie: &str) -> oauth_client::auth::OAuthSession {
        self.state
            .sessions
            .peek(cookie)
            .await
            .expect("session exists")
    }
}

/// Current value of one series from the `/metrics` scrape, 0 when absent
///
/// `series` is the metric name plus labels exactly as exposed, e.g.
/// `oauth_client_callbacks_total{outcome="success"}`.
pub async fn metric_value(server: &TestServer, series: &str) -> f64 {
    let body = server.get("/metrics", None).await.text().await.unwrap();
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (name, value) = line.rsplit_once(' ')?;
            (name == series).then(|| value.parse().ok())?
        })
        .unwrap_or(0.0)
}

/// Value of the session cookie set by `response`, if any
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .find_map(|value| {
            let raw = value.to_str().ok()?;
            let cookie_pair = raw.split(';').next()?;
            let (name, value) = cookie_pair.split_once('=')?;
            (name == COOKIE_NAME).then(|| value.to_string())
        })
}

/// `Location` header of a redirect
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

/// Decoded query parameter of an absolute URL
pub fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.to_string())
}
