use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the HTTP session layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error (HTTP {code}): {message}")]
    Status { code: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Outcome of a write request. The status is handed back raw; the photo
/// endpoint counts exactly HTTP 200 as success, and that judgment belongs
/// to the caller.
#[derive(Debug)]
pub struct PutResponse {
    pub status: reqwest::StatusCode,
    pub body: String,
}

/// Minimal async session used by the directory service.
/// The concrete implementation lives in `crate::auth::session`.
#[async_trait]
pub trait AdminSession: Send + Sync {
    /// GET a JSON document. Non-success statuses become `ApiError::Status`.
    async fn get_json(&self, url: &str) -> Result<Value, ApiError>;

    /// PUT a JSON body, returning the raw status and response body.
    async fn put_json(&self, url: &str, body: &Value) -> Result<PutResponse, ApiError>;
}

/// Pull a human-readable message out of an error response body.
///
/// The Admin SDK wraps errors as `{"error": {"message": ...}}`; the OAuth
/// token endpoint replies with `{"error": ..., "error_description": ...}`.
/// Anything unrecognized comes back as-is, truncated.
pub(crate) fn api_error_message(body: &str) -> String {
    const MAX_RAW_LEN: usize = 200;

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
        if let Some(description) = json.get("error_description").and_then(Value::as_str) {
            return description.to_string();
        }
        if let Some(error) = json.get("error").and_then(Value::as_str) {
            return error.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(empty response body)".to_string();
    }
    trimmed.chars().take(MAX_RAW_LEN).collect()
}
