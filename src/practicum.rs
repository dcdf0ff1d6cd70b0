//! Review API client, response model, and response validation.
//!
//! One authenticated GET per cycle with a `from_date` lower bound. The
//! response keeps its homework entries schemaless until validated: a
//! malformed first entry must be reported differently from an unparsable
//! body, so the page cannot be rejected wholesale at deserialization time.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while fetching one page of review results.
///
/// All three variants classify as the same reporting kind: the remote
/// service gave us nothing we can trust.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-200 status. No payload is trusted.
    #[error("review API returned HTTP {code}")]
    Status {
        /// The HTTP status code received.
        code: reqwest::StatusCode,
    },

    /// The request itself failed (DNS, connect, timeout).
    #[error("review API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 200 answer whose body is not valid JSON.
    #[error("review API body is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors raised while validating the shape of a fetched page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    /// The response carried neither homeworks nor a server timestamp.
    #[error("review API returned an empty response")]
    Empty,

    /// `homeworks[0]` exists but is not a JSON object.
    #[error("first homework entry is not an object")]
    FirstEntryNotAMapping,
}

// ---------------------------------------------------------------------------
// Response model
// ---------------------------------------------------------------------------

/// One page of review API results.
#[derive(Debug, Deserialize)]
pub struct PollResponse {
    /// Homework records, newest first. Entries stay schemaless until
    /// validated by [`extract_latest_homework`].
    #[serde(default)]
    pub homeworks: Vec<serde_json::Value>,

    /// Server-side timestamp (epoch seconds) used as the next cycle's
    /// `from_date`. Absent in degenerate responses.
    #[serde(default)]
    pub current_date: Option<i64>,
}

/// The fields of a homework record the watcher cares about.
///
/// Both fields are optional here; the mapper decides whether an incomplete
/// record is renderable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HomeworkRecord {
    /// Homework title as shown to the student.
    #[serde(default)]
    pub homework_name: Option<String>,

    /// Review status keyword (`approved`, `reviewing`, `rejected`).
    #[serde(default)]
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Read access to the homework review feed.
#[async_trait]
pub trait HomeworkApi: Send + Sync {
    /// Fetch every homework that changed since `from_date` (epoch seconds).
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on non-200 answers, transport failures, or
    /// unparsable bodies. No retries happen inside the call; trying again
    /// next cycle is the driver's job.
    async fn fetch_updates(&self, from_date: i64) -> Result<PollResponse, ApiError>;
}

/// [`HomeworkApi`] over the Practicum HTTP endpoint.
pub struct PracticumClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for PracticumClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticumClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl PracticumClient {
    /// Build a client for `endpoint` authenticating with `token`.
    ///
    /// The timeout applies to every request, connect included.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
            token: token.to_owned(),
        })
    }
}

#[async_trait]
impl HomeworkApi for PracticumClient {
    async fn fetch_updates(&self, from_date: i64) -> Result<PollResponse, ApiError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("OAuth {}", self.token),
            )
            .query(&[("from_date", from_date)])
            .send()
            .await?;

        let code = resp.status();
        if code != reqwest::StatusCode::OK {
            return Err(ApiError::Status { code });
        }

        let body = resp.text().await?;
        let parsed: PollResponse = serde_json::from_str(&body)?;

        debug!(
            current_date = ?parsed.current_date,
            homeworks = parsed.homeworks.len(),
            "review API answered"
        );
        Ok(parsed)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Pull the latest homework record out of a fetched page.
///
/// `Ok(None)` means the feed has no homework for this window; that is a
/// normal answer, not an error. Entries past index 0 are ignored: when
/// several homeworks change in one window only the newest is reported.
///
/// # Errors
///
/// [`ResponseError::Empty`] when the page carries neither homeworks nor a
/// server timestamp, [`ResponseError::FirstEntryNotAMapping`] when the
/// first entry is not a JSON object.
pub fn extract_latest_homework(
    resp: &PollResponse,
) -> Result<Option<HomeworkRecord>, ResponseError> {
    if resp.current_date.is_none() && resp.homeworks.is_empty() {
        return Err(ResponseError::Empty);
    }

    let Some(first) = resp.homeworks.first() else {
        return Ok(None);
    };

    if !first.is_object() {
        return Err(ResponseError::FirstEntryNotAMapping);
    }

    // Wrongly-typed fields are as unusable as a non-object entry.
    serde_json::from_value(first.clone())
        .map(Some)
        .map_err(|_| ResponseError::FirstEntryNotAMapping)
}
