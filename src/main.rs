//! gw-photo-sync — bulk profile photo uploader for Google Workspace.
//!
//! Authenticates to the Admin SDK Directory API with a service-account key
//! (JWT bearer grant, optionally impersonating an admin), pages through the
//! domain's users, matches local image filenames against primary emails, and
//! uploads each match as the account's profile photo thumbnail.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod directory;
mod shutdown;
mod types;
mod upload;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use directory::{DirectoryClient, DirectoryMapping, UserSummary, DIRECTORY_API_ROOT};

/// Print every directory user, sorted by email, with flags for suspended and
/// admin accounts.
fn print_users(users: &DirectoryMapping) {
    let mut entries: Vec<&UserSummary> = users.values().collect();
    entries.sort_by(|a, b| a.email.cmp(&b.email));

    println!("Users ({}):", entries.len());
    for user in entries {
        let mut flags = String::new();
        if user.suspended {
            flags.push_str(" [suspended]");
        }
        if user.is_admin {
            flags.push_str(" [admin]");
        }
        if user.name.is_empty() {
            println!("  {}{}", user.email, flags);
        } else {
            println!("  {} ({}){}", user.email, user.name, flags);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::info!(
        domain = %config.domain,
        concurrency = config.concurrency,
        "Starting gw-photo-sync"
    );

    let key = auth::credentials::ServiceAccountKey::load(&config.key_file).await?;
    let http = auth::session::build_http_client().context("Failed to build HTTP client")?;
    let token = auth::authenticate(&http, &key, &config.scopes, config.subject.as_deref()).await?;
    let session = auth::session::AuthedClient::new(http, &token);

    let directory_client =
        DirectoryClient::new(Box::new(session.clone()), DIRECTORY_API_ROOT.to_string());
    let users = directory_client
        .fetch_all_users(&config.domain, config.page_size)
        .await?;

    if config.list_users {
        print_users(&users);
        return Ok(());
    }

    let photo_dir = match &config.photo_dir {
        Some(dir) => dir,
        None => anyhow::bail!("--photo-dir is required for uploading"),
    };
    let tasks = upload::scan::scan_images(photo_dir, &users, &config.domain).await?;

    if config.dry_run {
        upload::dry_run_report(&tasks);
        return Ok(());
    }

    let upload_config = upload::UploadConfig {
        delay: config.delay,
        concurrency: config.concurrency as usize,
        no_progress_bar: config.no_progress_bar,
    };

    let shutdown_token = shutdown::install_signal_handler();
    upload::upload_photos(
        &session,
        DIRECTORY_API_ROOT,
        tasks,
        &upload_config,
        &shutdown_token,
    )
    .await
}
