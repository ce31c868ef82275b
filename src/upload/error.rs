use thiserror::Error;

use crate::directory::session::ApiError;

/// Typed upload errors, one per settled task.
///
/// A run never aborts mid-stream on these: every dispatched task settles to
/// an `Ok` or one of these variants, and the caller inspects the aggregate.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The photo endpoint answered, but not with HTTP 200.
    ///
    /// Anything other than 200 counts as a failed upload, including other
    /// 2xx codes the endpoint is not documented to return.
    #[error("Photo rejected (HTTP {code}): {message}")]
    Rejected { code: u16, message: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}
