//! Status-to-verdict mapping and notification rendering.

use thiserror::Error;

use crate::practicum::HomeworkRecord;

/// Line sent when the review feed has no homework to report on.
pub const NO_ACTIVE_HOMEWORK: &str = "no active homework";

/// The known review statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeworkStatus {
    /// The reviewer accepted the work.
    Approved,
    /// A reviewer picked the work up.
    Reviewing,
    /// The reviewer sent the work back.
    Rejected,
}

impl HomeworkStatus {
    /// Parse a status keyword from the review API.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(Self::Approved),
            "reviewing" => Some(Self::Reviewing),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Localized verdict text shown to the student.
    pub fn verdict(self) -> &'static str {
        match self {
            Self::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            Self::Reviewing => "Работа взята на проверку ревьюером.",
            Self::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

/// Errors raised for records that cannot be rendered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The record has no `homework_name`.
    #[error("homework entry has no homework_name")]
    MissingName,

    /// The record has no `status`.
    #[error("homework entry has no status")]
    MissingStatus,

    /// The record's status is outside the known set.
    #[error("homework status is not recognised: {0}")]
    UnknownStatus(String),
}

/// Render the notification line for the latest homework.
///
/// `None` means the feed currently has no homework; the fixed
/// [`NO_ACTIVE_HOMEWORK`] sentinel goes through the same dedup path as real
/// status lines. A record with no name or an unrecognised status is a hard
/// error: rendering a placeholder verdict would mask a real API contract
/// change.
///
/// # Errors
///
/// Returns a [`RenderError`] for incomplete or unrecognised records.
pub fn render_status(latest: Option<&HomeworkRecord>) -> Result<String, RenderError> {
    let Some(record) = latest else {
        return Ok(NO_ACTIVE_HOMEWORK.to_owned());
    };

    let name = record
        .homework_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or(RenderError::MissingName)?;

    let status = record
        .status
        .as_deref()
        .ok_or(RenderError::MissingStatus)?;

    let verdict = HomeworkStatus::parse(status)
        .ok_or_else(|| RenderError::UnknownStatus(status.to_owned()))?
        .verdict();

    Ok(format!(
        "Изменился статус проверки работы \"{name}\". {verdict}"
    ))
}
