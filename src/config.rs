use std::path::PathBuf;
use std::time::Duration;

/// Directory API page size ceiling enforced by the server.
const MAX_PAGE_SIZE: u32 = 500;

/// Application configuration.
///
/// Fields are ordered heap types first, then primitives by size, booleans last.
#[derive(Debug, Clone)]
pub struct Config {
    // Heap types first
    pub domain: String,
    pub key_file: PathBuf,
    pub subject: Option<String>,
    pub scopes: Vec<String>,
    pub photo_dir: Option<PathBuf>,

    // Delay between queued upload start times
    pub delay: Duration,

    // 4-byte primitives
    pub page_size: u32,

    // 2-byte primitives
    pub concurrency: u16,

    // All booleans grouped together
    pub list_users: bool,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        if cli.domain.trim().is_empty() {
            anyhow::bail!("--domain must not be empty");
        }
        if cli.page_size == 0 || cli.page_size > MAX_PAGE_SIZE {
            anyhow::bail!(
                "--page-size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                cli.page_size
            );
        }
        if cli.concurrency == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }
        if cli.scopes.iter().any(|s| s.trim().is_empty()) {
            anyhow::bail!("--scope must not be empty");
        }

        let key_file = expand_tilde(&cli.key_file);
        let photo_dir = cli.photo_dir.as_deref().map(expand_tilde);

        Ok(Self {
            domain: cli.domain,
            key_file,
            subject: cli.subject,
            scopes: cli.scopes,
            photo_dir,
            delay: Duration::from_millis(cli.delay_ms),
            page_size: cli.page_size,
            concurrency: cli.concurrency,
            list_users: cli.list_users,
            dry_run: cli.dry_run,
            no_progress_bar: cli.no_progress_bar,
        })
    }
}
