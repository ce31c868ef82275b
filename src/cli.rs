use crate::types::LogLevel;
use clap::Parser;

/// Default OAuth scope for Admin SDK Directory user and photo management.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/admin.directory.user";

#[derive(Parser, Debug)]
#[command(
    name = "gw-photo-sync",
    about = "Upload profile photos to a Google Workspace directory",
    version
)]
pub struct Cli {
    /// Workspace domain whose users are enumerated (e.g. example.com)
    #[arg(short = 'D', long, env = "GWPS_DOMAIN")]
    pub domain: String,

    /// Path to the service-account key file (JSON).
    /// WARNING: the file contains a private key; keep permissions tight.
    #[arg(short = 'k', long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub key_file: String,

    /// Admin account to impersonate via domain-wide delegation
    #[arg(short = 's', long, env = "GWPS_SUBJECT")]
    pub subject: Option<String>,

    /// OAuth scope(s) to request (repeatable)
    #[arg(long = "scope", default_values_t = [DEFAULT_SCOPE.to_string()])]
    pub scopes: Vec<String>,

    /// Local directory of photos named {local-part}.{ext}
    #[arg(short = 'd', long)]
    pub photo_dir: Option<String>,

    /// Users fetched per directory page (1-500)
    #[arg(long, default_value_t = 500)]
    pub page_size: u32,

    /// Maximum uploads in flight at once
    #[arg(long, default_value_t = 4)]
    pub concurrency: u16,

    /// Start-time spacing between queued uploads, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub delay_ms: u64,

    /// List directory users and exit
    #[arg(short = 'l', long)]
    pub list_users: bool,

    /// Scan and report what would be uploaded, without uploading
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}
