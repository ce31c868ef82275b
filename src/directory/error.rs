use thiserror::Error;

use crate::directory::session::ApiError;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A listing page came back without a `users` field. Distinct from an
    /// empty page: `users: []` is a valid zero-user result.
    #[error("no users returned in response JSON")]
    MissingUsers,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
