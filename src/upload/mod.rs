//! Upload engine: staggered, bounded dispatch of profile photo writes.
//!
//! Tasks flow through a bounded stream: the k-th task (1-based) sleeps until
//! k × delay past the moment dispatch began, and at most `concurrency` PUTs
//! are in flight at once. Every dispatched task settles to a typed result;
//! results are aggregated after the stream drains, and the caller decides
//! whether any failure aborts the run.

pub mod encode;
pub mod error;
pub mod scan;

use std::io::IsTerminal;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub use self::error::UploadError;
use crate::directory::session::{api_error_message, AdminSession};

/// Fixed fields the photo endpoint expects on every record.
const PHOTO_KIND: &str = "admin#directory#user#photo";
const PHOTO_MIME_TYPE: &str = "JPEG";
const PHOTO_DIMENSION: u32 = 250;

/// Subset of application config the upload engine needs.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub delay: Duration,
    pub concurrency: usize,
    pub no_progress_bar: bool,
}

/// One photo write: the account it belongs to plus the encoded payload.
#[derive(Debug, Clone)]
pub struct PhotoTask {
    /// Canonical primary email from the directory record, not the filename.
    pub primary_email: String,
    /// Immutable directory id for the account.
    pub workspace_id: String,
    /// URL-safe base64 of the raw image bytes.
    pub photo_data: String,
    /// MD5 hex fingerprint of the raw image bytes.
    pub etag: String,
}

/// Aggregate of one run; every task lands in exactly one bucket.
#[derive(Debug)]
struct UploadOutcome {
    uploaded: usize,
    failed: Vec<(String, UploadError)>,
    /// Tasks never dispatched because shutdown was requested.
    skipped: usize,
}

/// PUT target for an account's thumbnail photo. The email is percent-escaped
/// into the path, so `@` travels as `%40` and a space as `%20`.
fn photo_url(base_url: &str, email: &str) -> String {
    // byte_serialize form-encodes a space as `+` (a literal `+` becomes
    // `%2B`), so any `+` in its output is a space and gets the path form.
    let escaped: String = url::form_urlencoded::byte_serialize(email.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("{}/users/{}/photos/thumbnail", base_url, escaped)
}

fn photo_body(task: &PhotoTask) -> serde_json::Value {
    json!({
        "id": task.workspace_id,
        "primaryEmail": task.primary_email,
        "kind": PHOTO_KIND,
        "etag": task.etag,
        "photoData": task.photo_data,
        "mimeType": PHOTO_MIME_TYPE,
        "width": PHOTO_DIMENSION,
        "height": PHOTO_DIMENSION,
    })
}

/// Send one photo. Success is HTTP 200 exactly; any other status becomes
/// `Rejected` carrying whatever message the response body held.
async fn upload_single(
    session: &dyn AdminSession,
    base_url: &str,
    task: &PhotoTask,
) -> Result<(), UploadError> {
    let url = photo_url(base_url, &task.primary_email);
    let response = session.put_json(&url, &photo_body(task)).await?;
    if response.status != reqwest::StatusCode::OK {
        return Err(UploadError::Rejected {
            code: response.status.as_u16(),
            message: api_error_message(&response.body),
        });
    }
    Ok(())
}

/// Progress bar for an upload run; hidden when disabled or when stdout is
/// not a terminal.
fn create_progress_bar(no_progress_bar: bool, len: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .expect("valid template")
            .progress_chars("=> "),
    );
    pb
}

/// Dispatch every task and collect settled results.
///
/// Positions are 1-based: the k-th task does not start before k × delay past
/// the moment this function begins, regardless of how fast earlier tasks
/// finish. A cancelled shutdown token stops new dispatch; tasks already in
/// flight run to completion and still count in the outcome.
async fn run_uploads(
    session: &dyn AdminSession,
    base_url: &str,
    tasks: Vec<PhotoTask>,
    config: &UploadConfig,
    shutdown_token: &CancellationToken,
) -> UploadOutcome {
    let total = tasks.len();
    let pb = create_progress_bar(config.no_progress_bar, total as u64);
    let started = tokio::time::Instant::now();
    let delay = config.delay;

    let pb_ref = &pb;
    let results: Vec<(String, Result<(), UploadError>)> =
        stream::iter(tasks.into_iter().enumerate())
            .take_while(|_| std::future::ready(!shutdown_token.is_cancelled()))
            .map(|(position, task)| async move {
                tokio::time::sleep_until(started + delay * (position + 1) as u32).await;
                pb_ref.set_message(task.primary_email.clone());
                let result = upload_single(session, base_url, &task).await;
                match &result {
                    Ok(()) => {
                        pb_ref.suspend(|| info!(email = %task.primary_email, "Uploaded photo"));
                    }
                    Err(e) => {
                        pb_ref
                            .suspend(|| error!(email = %task.primary_email, "Upload failed: {}", e));
                    }
                }
                pb_ref.inc(1);
                (task.primary_email, result)
            })
            .buffer_unordered(config.concurrency)
            .collect()
            .await;

    pb.finish_and_clear();

    let mut outcome = UploadOutcome {
        uploaded: 0,
        failed: Vec::new(),
        skipped: 0,
    };
    for (email, result) in results {
        match result {
            Ok(()) => outcome.uploaded += 1,
            Err(e) => outcome.failed.push((email, e)),
        }
    }
    outcome.skipped = total - outcome.uploaded - outcome.failed.len();
    outcome
}

/// Upload all photos and log a summary.
///
/// A failed task never stops the stream; once everything settles, any
/// failure fails the whole run so the exit status reflects it.
pub async fn upload_photos(
    session: &dyn AdminSession,
    base_url: &str,
    tasks: Vec<PhotoTask>,
    config: &UploadConfig,
    shutdown_token: &CancellationToken,
) -> anyhow::Result<()> {
    if tasks.is_empty() {
        info!("No photos to upload");
        return Ok(());
    }

    let total = tasks.len();
    let started = std::time::Instant::now();
    info!(total, concurrency = config.concurrency, "Uploading photos");

    let outcome = run_uploads(session, base_url, tasks, config, shutdown_token).await;

    info!("── Summary ──");
    info!("  Uploaded: {}", outcome.uploaded);
    info!("  Failed: {}", outcome.failed.len());
    if outcome.skipped > 0 {
        info!("  Skipped (shutdown): {}", outcome.skipped);
    }
    info!("  Elapsed: {}", format_duration(started.elapsed()));

    if !outcome.failed.is_empty() {
        anyhow::bail!("{} of {} uploads failed", outcome.failed.len(), total);
    }
    Ok(())
}

/// Report what an upload run would send, without sending anything.
pub fn dry_run_report(tasks: &[PhotoTask]) {
    info!("── Dry Run Summary ──");
    for task in tasks {
        info!("  Would upload photo for {}", task.primary_email);
    }
    info!("  {} photos would be uploaded", tasks.len());
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::directory::session::{ApiError, PutResponse};

    const TEST_BASE: &str = "https://admin.test/directory/v1";

    #[derive(Debug, Clone)]
    struct RecordedPut {
        url: String,
        body: Value,
        /// Time between session construction and dispatch of this PUT.
        offset: Duration,
    }

    /// Session double that records every PUT and can fail selected accounts.
    struct FakeUploadSession {
        put_delay: Duration,
        fail_fragments: Vec<String>,
        started: tokio::time::Instant,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: Arc<Mutex<Vec<RecordedPut>>>,
    }

    impl FakeUploadSession {
        fn new() -> (Self, Arc<Mutex<Vec<RecordedPut>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let session = Self {
                put_delay: Duration::ZERO,
                fail_fragments: Vec::new(),
                started: tokio::time::Instant::now(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: calls.clone(),
            };
            (session, calls)
        }
    }

    #[async_trait]
    impl AdminSession for FakeUploadSession {
        async fn get_json(&self, _url: &str) -> Result<Value, ApiError> {
            unimplemented!("the upload engine never issues GETs")
        }

        async fn put_json(&self, url: &str, body: &Value) -> Result<PutResponse, ApiError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            self.calls.lock().unwrap().push(RecordedPut {
                url: url.to_string(),
                body: body.clone(),
                offset: self.started.elapsed(),
            });
            if !self.put_delay.is_zero() {
                tokio::time::sleep(self.put_delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_fragments.iter().any(|f| url.contains(f.as_str())) {
                Ok(PutResponse {
                    status: reqwest::StatusCode::FORBIDDEN,
                    body: r#"{"error": {"code": 403, "message": "Not Authorized"}}"#.to_string(),
                })
            } else {
                Ok(PutResponse {
                    status: reqwest::StatusCode::OK,
                    body: String::new(),
                })
            }
        }
    }

    /// Session double that answers every PUT with one fixed status and body.
    struct StatusSession {
        status: reqwest::StatusCode,
        body: &'static str,
    }

    #[async_trait]
    impl AdminSession for StatusSession {
        async fn get_json(&self, _url: &str) -> Result<Value, ApiError> {
            unimplemented!("the upload engine never issues GETs")
        }

        async fn put_json(&self, _url: &str, _body: &Value) -> Result<PutResponse, ApiError> {
            Ok(PutResponse {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    fn task(email: &str) -> PhotoTask {
        PhotoTask {
            primary_email: email.to_string(),
            workspace_id: format!("id-{}", email),
            photo_data: "cGhvdG8".to_string(),
            etag: "900150983cd24fb0d6963f7d28e17f72".to_string(),
        }
    }

    fn test_config(concurrency: usize, delay_ms: u64) -> UploadConfig {
        UploadConfig {
            delay: Duration::from_millis(delay_ms),
            concurrency,
            no_progress_bar: true,
        }
    }

    #[test]
    fn test_photo_url_escapes_email() {
        let url = photo_url(TEST_BASE, "alice.name@example.com");
        assert_eq!(
            url,
            "https://admin.test/directory/v1/users/alice.name%40example.com/photos/thumbnail"
        );
    }

    #[test]
    fn test_photo_url_escapes_plus_sign() {
        let url = photo_url(TEST_BASE, "a+b@example.com");
        assert!(url.contains("/users/a%2Bb%40example.com/"));
    }

    #[test]
    fn test_photo_url_percent_encodes_spaces() {
        // A form-encoded `+` in the path would decode as a literal plus.
        let url = photo_url(TEST_BASE, "a b@example.com");
        assert!(url.contains("/users/a%20b%40example.com/"));
        assert!(!url.contains('+'));
    }

    #[test]
    fn test_photo_body_shape() {
        let body = photo_body(&task("alice@example.com"));
        assert_eq!(
            body,
            json!({
                "id": "id-alice@example.com",
                "primaryEmail": "alice@example.com",
                "kind": "admin#directory#user#photo",
                "etag": "900150983cd24fb0d6963f7d28e17f72",
                "photoData": "cGhvdG8",
                "mimeType": "JPEG",
                "width": 250,
                "height": 250,
            })
        );
    }

    #[tokio::test]
    async fn test_upload_single_accepts_only_200() {
        let ok = StatusSession {
            status: reqwest::StatusCode::OK,
            body: "",
        };
        assert!(upload_single(&ok, TEST_BASE, &task("a@x.com")).await.is_ok());

        // Even another 2xx is a failure for this endpoint.
        let no_content = StatusSession {
            status: reqwest::StatusCode::NO_CONTENT,
            body: "",
        };
        let err = upload_single(&no_content, TEST_BASE, &task("a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Rejected { code: 204, .. }));
    }

    #[tokio::test]
    async fn test_upload_single_extracts_rejection_message() {
        let session = StatusSession {
            status: reqwest::StatusCode::PRECONDITION_FAILED,
            body: r#"{"error": {"code": 412, "message": "Mismatch in etag"}}"#,
        };
        let err = upload_single(&session, TEST_BASE, &task("a@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Photo rejected (HTTP 412): Mismatch in etag");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_uploads_staggers_task_starts() {
        let (session, calls) = FakeUploadSession::new();
        let tasks = vec![task("a@x.com"), task("b@x.com"), task("c@x.com")];
        let config = test_config(4, 250);
        let token = CancellationToken::new();

        let outcome = run_uploads(&session, TEST_BASE, tasks, &config, &token).await;
        assert_eq!(outcome.uploaded, 3);

        let mut offsets: Vec<Duration> = calls.lock().unwrap().iter().map(|c| c.offset).collect();
        offsets.sort();
        for (index, offset) in offsets.iter().enumerate() {
            let floor = Duration::from_millis(250) * (index + 1) as u32;
            assert!(
                *offset >= floor,
                "task {} dispatched at {:?}, before its {:?} floor",
                index,
                offset,
                floor
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_uploads_bounds_in_flight_requests() {
        let (mut session, calls) = FakeUploadSession::new();
        session.put_delay = Duration::from_millis(50);
        let tasks: Vec<PhotoTask> = (0..8).map(|i| task(&format!("user{}@x.com", i))).collect();
        let config = test_config(3, 0);
        let token = CancellationToken::new();

        let outcome = run_uploads(&session, TEST_BASE, tasks, &config, &token).await;

        assert_eq!(outcome.uploaded, 8);
        assert_eq!(calls.lock().unwrap().len(), 8);
        assert_eq!(session.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_uploads_aggregates_failures_without_aborting() {
        let (mut session, calls) = FakeUploadSession::new();
        session.fail_fragments = vec!["bob".to_string()];
        let tasks = vec![task("alice@x.com"), task("bob@x.com"), task("carol@x.com")];
        // Serial dispatch proves later tasks still run after a failure.
        let config = test_config(1, 0);
        let token = CancellationToken::new();

        let outcome = run_uploads(&session, TEST_BASE, tasks, &config, &token).await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].url.ends_with("/users/bob%40x.com/photos/thumbnail"));
        assert_eq!(calls[1].body["primaryEmail"], "bob@x.com");
        assert_eq!(calls[1].body["kind"], "admin#directory#user#photo");

        assert_eq!(outcome.uploaded, 2);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.failed.len(), 1);
        let (email, error) = &outcome.failed[0];
        assert_eq!(email, "bob@x.com");
        assert!(matches!(error, UploadError::Rejected { code: 403, .. }));
        assert_eq!(error.to_string(), "Photo rejected (HTTP 403): Not Authorized");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_uploads_pre_cancelled_token_dispatches_nothing() {
        let (session, calls) = FakeUploadSession::new();
        let tasks = vec![task("a@x.com"), task("b@x.com")];
        let config = test_config(2, 0);
        let token = CancellationToken::new();
        token.cancel();

        let outcome = run_uploads(&session, TEST_BASE, tasks, &config, &token).await;

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(outcome.uploaded, 0);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.skipped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_photos_fails_when_any_photo_rejected() {
        let (mut session, _calls) = FakeUploadSession::new();
        session.fail_fragments = vec!["bob".to_string()];
        let tasks = vec![task("alice@x.com"), task("bob@x.com")];
        let config = test_config(2, 0);
        let token = CancellationToken::new();

        let result = upload_photos(&session, TEST_BASE, tasks, &config, &token).await;
        let err = result.unwrap_err().to_string();
        assert_eq!(err, "1 of 2 uploads failed");
    }

    #[tokio::test]
    async fn test_upload_photos_with_no_tasks_is_ok() {
        let (session, calls) = FakeUploadSession::new();
        let config = test_config(2, 0);
        let token = CancellationToken::new();

        let result = upload_photos(&session, TEST_BASE, Vec::new(), &config, &token).await;

        assert!(result.is_ok());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_create_progress_bar_hidden_when_disabled() {
        let pb = create_progress_bar(true, 10);
        assert!(pb.is_hidden());
    }

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_format_duration_hours() {
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
