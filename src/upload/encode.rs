//! Wire encoding for photo payloads.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use md5::{Digest, Md5};

/// Encode raw image bytes as the URL-safe base64 the photo endpoint expects.
///
/// The endpoint uses the web-safe alphabet (`-` and `_` in place of `+` and
/// `/`) and tolerates missing padding, so none is emitted.
pub fn encode_photo(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Content fingerprint sent as the etag on the photo record.
///
/// MD5 over the raw image bytes (not the base64 text), rendered as lowercase
/// hex. Two runs over the same file always produce the same etag.
pub fn content_etag(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
