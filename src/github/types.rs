//! GitHub wire types

use serde::{Deserialize, Serialize};

/// Body of `POST /login/oauth/access_token` with `Accept: application/json`
///
/// GitHub answers a rejected code with `200 OK` and an `error` field, so every
/// field is optional here and the client decides what a success is.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// A repository as shown in the `repos` view
///
/// Read from the API's `html_url`, written out as `htmlUrl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct Repository {
    pub name: String,
    pub html_url: String,
}
