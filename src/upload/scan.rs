//! Local photo scan: filename stem → candidate email → directory match.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::encode::{content_etag, encode_photo};
use super::PhotoTask;
use crate::directory::DirectoryMapping;

/// Candidate email for a filename: lowercased stem plus `@domain`.
///
/// The stem is everything before the final extension, so `Alice.Name.png`
/// yields `alice.name@example.com`. Returns `None` for names that are not
/// valid UTF-8.
fn candidate_email(path: &Path, domain: &str) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(format!("{}@{}", stem.to_lowercase(), domain))
}

/// Walk `photo_dir` and build one upload task per image whose filename maps
/// to an existing, non-suspended account.
///
/// Entries are visited in filename order so task positions, and the
/// start-time skew derived from them, are deterministic across runs.
/// Unmatched and suspended entries are skipped, not errors; an unreadable
/// directory or image file is.
pub async fn scan_images(
    photo_dir: &Path,
    directory: &DirectoryMapping,
    domain: &str,
) -> Result<Vec<PhotoTask>> {
    let mut read_dir = tokio::fs::read_dir(photo_dir)
        .await
        .with_context(|| format!("Failed to read photo directory {}", photo_dir.display()))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            debug!("Skipping non-file entry {}", entry.path().display());
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort();

    let scanned = entries.len();
    let mut tasks = Vec::new();
    for path in entries {
        let candidate = match candidate_email(&path, domain) {
            Some(candidate) => candidate,
            None => {
                debug!("Skipping non-UTF-8 filename {}", path.display());
                continue;
            }
        };
        let user = match directory.get(&candidate) {
            Some(user) => user,
            None => {
                debug!(%candidate, "No account for {}", path.display());
                continue;
            }
        };
        if user.suspended {
            info!(email = %user.email, "Skipping suspended account");
            continue;
        }

        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        tasks.push(PhotoTask {
            primary_email: user.email.clone(),
            workspace_id: user.id.clone(),
            photo_data: encode_photo(&bytes),
            etag: content_etag(&bytes),
        });
    }

    info!(matched = tasks.len(), scanned, "Photo scan complete");
    Ok(tasks)
}
