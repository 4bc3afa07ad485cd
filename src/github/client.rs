//! `reqwest`-backed GitHub client

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use std::time::{Duration, Instant};

use super::types::{AccessTokenResponse, Repository};
use super::GitHubApi;
use crate::config::GitHubConfig;
use crate::error::AppError;

const USER_AGENT: &str = concat!("oauth-client/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";

/// GitHub OAuth App client
///
/// Holds the app credentials and one shared connection pool.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    /// Build a client for the configured endpoints
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot be initialized
    pub fn new(config: &GitHubConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Form fields sent to the token endpoint
    ///
    /// Note the parameter is `redirect_uri` here but `redirect_url` on the
    /// authorize redirect.
    fn token_request_form<'a>(&'a self, code: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.token_redirect_uri.as_str()),
            ("code", code),
        ]
    }

    fn repos_url(&self) -> String {
        format!("{}/user/repos", self.config.api_url.trim_end_matches('/'))
    }
}

fn record_request(endpoint: &str, status: Option<StatusCode>, started: Instant) {
    use crate::metrics::{GITHUB_REQUEST_DURATION_SECONDS, GITHUB_REQUESTS_TOTAL};

    let status_label = status
        .map(|s| s.as_u16().to_string())
        .unwrap_or_else(|| "error".to_string());
    GITHUB_REQUESTS_TOTAL
        .with_label_values(&[endpoint, status_label.as_str()])
        .inc();
    GITHUB_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(started.elapsed().as_secs_f64());
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let started = Instant::now();
        let result = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&self.token_request_form(code))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                record_request("token", None, started);
                return Err(error.into());
            }
        };

        let status = response.status();
        record_request("token", Some(status), started);

        if !status.is_success() {
            return Err(AppError::TokenExchange(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body: AccessTokenResponse = response.json().await?;
        match body.access_token.filter(|token| !token.trim().is_empty()) {
            Some(token) => {
                tracing::debug!(
                    token_type = ?body.token_type,
                    scope = ?body.scope,
                    "Access token issued"
                );
                Ok(token)
            }
            None => Err(AppError::TokenExchange(
                body.error_description
                    .or(body.error)
                    .unwrap_or_else(|| "response has no access_token".to_string()),
            )),
        }
    }

    async fn list_repos(&self, access_token: &str) -> Result<Vec<Repository>, AppError> {
        let started = Instant::now();
        let result = self
            .http
            .get(self.repos_url())
            .query(&[("sort", "created"), ("direction", "desc")])
            .bearer_auth(access_token)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                record_request("user_repos", None, started);
                return Err(error.into());
            }
        };

        let status = response.status();
        record_request("user_repos", Some(status), started);

        match status {
            StatusCode::UNAUTHORIZED => Err(AppError::TokenRevoked),
            s if s.is_success() => Ok(response.json().await?),
            s => Err(AppError::GitHubApi(format!("GET /user/repos returned {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GitHubClient {
        let mut config = crate::config::tests::valid_config().github;
        config.token_url = format!("{}/login/oauth/access_token", server.uri());
        config.api_url = server.uri();
        GitHubClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn exchange_sends_exact_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok123",
                "token_type": "bearer",
                "scope": "public_repo,user"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server).exchange_code("abc").await.unwrap();
        assert_eq!(token, "tok123");

        let requests = server.received_requests().await.unwrap();
        let fields: Vec<(String, String)> = url::form_urlencoded::parse(&requests[0].body)
            .into_owned()
            .collect();
        assert_eq!(
            fields,
            vec![
                ("grant_type".to_string(), "authorization_code".to_string()),
                ("client_id".to_string(), "github-client-id".to_string()),
                ("client_secret".to_string(), "github-client-secret".to_string()),
                (
                    "redirect_uri".to_string(),
                    "http://localhost:8080/authorize".to_string()
                ),
                ("code".to_string(), "abc".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn exchange_rejects_error_payload_with_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad_verification_code"
            })))
            .mount(&server)
            .await;

        let error = client_for(&server).exchange_code("stale").await.unwrap_err();
        assert!(matches!(error, AppError::TokenExchange(message) if message == "bad_verification_code"));
    }

    #[tokio::test]
    async fn exchange_rejects_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let error = client_for(&server).exchange_code("abc").await.unwrap_err();
        assert!(matches!(error, AppError::TokenExchange(_)));
    }

    #[tokio::test]
    async fn list_repos_sends_bearer_token_and_sort_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("sort", "created"))
            .and(query_param("direction", "desc"))
            .and(header("authorization", "Bearer tok123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "newest", "html_url": "https://github.com/octo/newest", "fork": false},
                {"name": "older", "html_url": "https://github.com/octo/older", "fork": true}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let repos = client_for(&server).list_repos("tok123").await.unwrap();
        assert_eq!(
            repos,
            vec![
                Repository {
                    name: "newest".to_string(),
                    html_url: "https://github.com/octo/newest".to_string(),
                },
                Repository {
                    name: "older".to_string(),
                    html_url: "https://github.com/octo/older".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn list_repos_maps_unauthorized_to_revoked_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "Bad credentials"
            })))
            .mount(&server)
            .await;

        let error = client_for(&server).list_repos("revoked").await.unwrap_err();
        assert!(matches!(error, AppError::TokenRevoked));
    }

    #[tokio::test]
    async fn list_repos_maps_server_error_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let error = client_for(&server).list_repos("tok123").await.unwrap_err();
        assert!(matches!(error, AppError::GitHubApi(_)));
    }
}
