#![allow(missing_docs)]

//! hwwatch — homework review status watcher.
//!
//! `start` runs the polling loop until ctrl-c; `check` does one
//! authenticated poll and prints the rendered status without notifying.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use hwwatch::config::{self, Config};
use hwwatch::credentials::{self, Credentials, CredentialsError};
use hwwatch::logging;
use hwwatch::practicum::{extract_latest_homework, HomeworkApi, PracticumClient};
use hwwatch::status::render_status;
use hwwatch::telegram::{Notifier, TelegramNotifier};
use hwwatch::watcher::Watcher;

#[derive(Parser)]
#[command(name = "hwwatch", version, about = "Homework review status watcher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the polling loop and run until ctrl-c.
    Start,
    /// Run a single poll and print the rendered status without notifying.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Start => start().await,
        Command::Check => check().await,
    }
}

/// Run the watcher loop with production logging.
async fn start() -> Result<()> {
    let paths = config::runtime_paths()?;
    let _guard = logging::init_watcher(&paths.logs_dir)?;

    credentials::load_env_file(&paths.env_file)?;
    let config = config::load_or_default(&paths.config_file)?;

    let credentials = match Credentials::from_env() {
        Ok(c) => c,
        Err(err) => {
            // Fatal configuration condition: one best-effort chat line,
            // then a non-zero exit.
            error!(error = %err, "credential validation failed, cannot start");
            report_startup_failure(&config, &err).await;
            return Err(err.into());
        }
    };

    info!(
        endpoint = %config.poll.endpoint,
        interval_secs = config.poll.interval_secs,
        "hwwatch starting"
    );

    let api = PracticumClient::new(
        &config.poll.endpoint,
        &credentials.practicum_token,
        config.poll.http_timeout(),
    )
    .context("failed to build review API client")?;

    let notifier = TelegramNotifier::new(
        &credentials.telegram_token,
        &credentials.telegram_chat_id,
        config.poll.http_timeout(),
    )
    .context("failed to build Telegram notifier")?;

    let watcher = Watcher::new(Arc::new(api), Arc::new(notifier), config.poll.interval());
    watcher.run().await
}

/// One-shot dry run: poll from the start of the window and print the result.
async fn check() -> Result<()> {
    logging::init_cli();

    let paths = config::runtime_paths()?;
    credentials::load_env_file(&paths.env_file)?;
    let config = config::load_or_default(&paths.config_file)?;
    let credentials = Credentials::from_env()?;

    let api = PracticumClient::new(
        &config.poll.endpoint,
        &credentials.practicum_token,
        config.poll.http_timeout(),
    )
    .context("failed to build review API client")?;

    let resp = api.fetch_updates(0).await?;
    let latest = extract_latest_homework(&resp)?;
    let message = render_status(latest.as_ref())?;

    println!("{message}");
    Ok(())
}

/// Best-effort chat notification about a fatal startup condition.
///
/// Only possible when the Telegram pair is itself present; a missing
/// review API token should still reach the chat.
async fn report_startup_failure(config: &Config, err: &CredentialsError) {
    let (Ok(token), Ok(chat_id)) = (
        std::env::var(credentials::TELEGRAM_TOKEN),
        std::env::var(credentials::TELEGRAM_CHAT_ID),
    ) else {
        return;
    };
    if token.trim().is_empty() || chat_id.trim().is_empty() {
        return;
    }

    match TelegramNotifier::new(&token, &chat_id, config.poll.http_timeout()) {
        Ok(notifier) => {
            if let Err(e) = notifier.send(&format!("hwwatch cannot start: {err}")).await {
                warn!(error = %e, "failed to deliver startup failure notification");
            }
        }
        Err(e) => warn!(error = %e, "failed to build notifier for startup failure notification"),
    }
}
