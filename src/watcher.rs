//! The poll/notify loop driver.
//!
//! One cycle: fetch → validate → render → deduplicate → notify → sleep.
//! Identical rendered lines are sent once; distinct failure kinds are
//! reported once per unbroken streak and the accounting resets on the next
//! good cycle. No cycle outcome ever terminates the loop; only ctrl-c does.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::practicum::{extract_latest_homework, ApiError, HomeworkApi, ResponseError};
use crate::status::{render_status, RenderError};
use crate::telegram::Notifier;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong inside one poll cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The review API could not be reached or answered garbage.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The fetched page has the wrong shape.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// The latest homework entry cannot be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Reporting bucket for once-per-streak chat diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Non-200 answer, transport failure, or unparsable body.
    NoResponse,
    /// The response body was empty.
    EmptyResponse,
    /// Wrong page shape or an unrenderable homework entry.
    Unrenderable,
}

impl ErrorKind {
    /// Fixed diagnostic line sent to the chat for this kind.
    pub fn diagnostic(self) -> &'static str {
        match self {
            Self::NoResponse => "No response from the review API",
            Self::EmptyResponse => "Empty response from the review API",
            Self::Unrenderable => "The latest homework entry cannot be rendered",
        }
    }
}

impl CycleError {
    /// Classify this error for streak accounting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(_) => ErrorKind::NoResponse,
            Self::Response(ResponseError::Empty) => ErrorKind::EmptyResponse,
            Self::Response(ResponseError::FirstEntryNotAMapping) | Self::Render(_) => {
                ErrorKind::Unrenderable
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Loop state
// ---------------------------------------------------------------------------

/// Driver-owned state surviving across cycles. In-memory only; a process
/// restart starts from a fresh window.
#[derive(Debug)]
pub struct LoopState {
    /// Last status line actually delivered to the chat.
    pub last_notified: Option<String>,

    /// Lower bound for the next cycle's `from_date` query parameter.
    pub from_date: i64,

    /// Error kinds already reported in the current unbroken streak.
    pub reported: HashSet<ErrorKind>,
}

impl LoopState {
    /// State for a loop whose first window starts at `from_date`.
    pub fn starting_at(from_date: i64) -> Self {
        Self {
            last_notified: None,
            from_date,
            reported: HashSet::new(),
        }
    }

    /// State for a loop whose first window starts now.
    pub fn starting_now() -> Self {
        Self::starting_at(Utc::now().timestamp())
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Polls the review feed and forwards status changes to the chat.
pub struct Watcher {
    api: Arc<dyn HomeworkApi>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl Watcher {
    /// Build a watcher over the given feed and chat transports.
    pub fn new(api: Arc<dyn HomeworkApi>, notifier: Arc<dyn Notifier>, interval: Duration) -> Self {
        Self {
            api,
            notifier,
            interval,
        }
    }

    /// Run the loop until ctrl-c.
    ///
    /// Sleeps the fixed interval after every cycle, success or error.
    ///
    /// # Errors
    ///
    /// Currently infallible at the loop level; the signature leaves room
    /// for setup failures surfaced by future transports.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut state = LoopState::starting_now();
        info!(
            interval_secs = self.interval.as_secs(),
            from_date = state.from_date,
            "watcher loop starting"
        );

        loop {
            self.run_cycle(&mut state).await;

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal, stopping watcher");
                    return Ok(());
                }
            }
        }
    }

    /// Execute exactly one poll/notify cycle against `state`.
    pub async fn run_cycle(&self, state: &mut LoopState) {
        match self.poll_once(state.from_date).await {
            Ok((message, current_date)) => {
                // A good answer ends every error streak.
                state.reported.clear();

                if let Some(ts) = current_date {
                    state.from_date = ts;
                }

                if state.last_notified.as_deref() == Some(message.as_str()) {
                    debug!("status unchanged, nothing to send");
                } else if self.send_best_effort(&message).await {
                    info!(message = %message, "status change delivered");
                    state.last_notified = Some(message);
                }
                // An undelivered change stays out of `last_notified` so the
                // next cycle sends it again.
            }
            Err(err) => {
                let kind = err.kind();
                error!(error = %err, ?kind, "poll cycle failed");

                if state.reported.insert(kind) {
                    self.send_best_effort(kind.diagnostic()).await;
                }
            }
        }
    }

    /// Fetch, validate, and render one poll window.
    async fn poll_once(&self, from_date: i64) -> Result<(String, Option<i64>), CycleError> {
        let resp = self.api.fetch_updates(from_date).await?;
        let latest = extract_latest_homework(&resp)?;
        let message = render_status(latest.as_ref())?;
        Ok((message, resp.current_date))
    }

    /// Send a chat message, swallowing delivery failures.
    ///
    /// Failing to notify about a failure must not take the loop down.
    async fn send_best_effort(&self, text: &str) -> bool {
        match self.notifier.send(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to deliver chat notification");
                false
            }
        }
    }
}
