//! Telegram notification transport over the raw Bot API.
//!
//! Send-only: the watcher never reads from the chat, so a full bot
//! framework would be dead weight. One `sendMessage` call per notification.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Base URL for the Telegram Bot API.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Errors raised while delivering a chat message.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The Bot API answered `ok: false`.
    #[error("Telegram API error: {0}")]
    Api(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Bot API response envelope. Payloads are ignored; delivery is all the
/// watcher cares about.
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Outbound chat transport the watcher notifies through.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message to the configured chat.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] when the Bot API rejects the message or
    /// the transport fails. Callers decide whether that is fatal; for the
    /// watcher it never is.
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// [`Notifier`] over the Telegram Bot API `sendMessage` endpoint.
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramNotifier {
    /// Build a notifier for `chat_id` authenticating as `bot_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            bot_token: bot_token.to_owned(),
            chat_id: chat_id.to_owned(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, self.bot_token);

        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        let response: TelegramResponse = resp.json().await?;

        if !response.ok {
            return Err(NotifyError::Api(
                response
                    .description
                    .unwrap_or_else(|| "sendMessage failed".to_owned()),
            ));
        }

        debug!(chat_id = %self.chat_id, "sent Telegram message");
        Ok(())
    }
}
