use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;

use crate::auth::AccessToken;
use crate::directory::session::{api_error_message, AdminSession, ApiError, PutResponse};

/// User agent sent on every request.
pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by the token exchange and the API session.
/// JSON accept header and user agent ride on every request made through it.
pub fn build_http_client() -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Client::builder()
        .default_headers(headers)
        .user_agent(APP_USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Bearer-authenticated session for the Admin SDK.
///
/// `reqwest::Client` is cheaply cloneable (backed by `Arc`), so clones share
/// the connection pool; the token rides along read-only.
#[derive(Clone)]
pub struct AuthedClient {
    client: Client,
    token: String,
}

impl std::fmt::Debug for AuthedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthedClient")
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl AuthedClient {
    pub fn new(client: Client, token: &AccessToken) -> Self {
        Self {
            client,
            token: token.token.clone(),
        }
    }
}

#[async_trait]
impl AdminSession for AuthedClient {
    async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                code: status.as_u16(),
                message: api_error_message(&body),
            });
        }
        Ok(response.json().await?)
    }

    async fn put_json(&self, url: &str, body: &Value) -> Result<PutResponse, ApiError> {
        tracing::debug!("PUT {}", url);
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok(PutResponse { status, body })
    }
}
