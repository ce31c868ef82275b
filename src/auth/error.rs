use thiserror::Error;

/// Errors raised while exchanging the service-account grant for a token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT assertion error: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    #[error("Token endpoint error (HTTP {code}): {message}")]
    TokenEndpoint { code: u16, message: String },

    #[error("Token response contained no access_token")]
    MissingAccessToken,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
