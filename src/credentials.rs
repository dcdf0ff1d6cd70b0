//! Credential loading from the environment and an optional runtime `.env`.
//!
//! Three values, all required: the review API token, the bot token, and the
//! chat the notifications go to. Absence of any is a fatal configuration
//! condition handled at startup, not inside the loop.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

/// Environment variable holding the review API OAuth token.
pub const PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";

/// Environment variable holding the destination Telegram chat ID.
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Errors raised while loading credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// One or more required variables are absent or empty.
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// The `.env` file is readable by group or others.
    #[error("credentials file {path} must be 0600, found {mode:o}")]
    Permissions {
        /// Path of the offending file.
        path: String,
        /// Observed permission bits.
        mode: u32,
    },

    /// The `.env` file exists but cannot be read or parsed.
    #[error("failed to read credentials file {path}: {reason}")]
    Unreadable {
        /// Path of the offending file.
        path: String,
        /// Underlying parse or IO failure.
        reason: String,
    },
}

/// The three credential values the watcher runs on.
#[derive(Clone)]
pub struct Credentials {
    /// OAuth token for the review API.
    pub practicum_token: String,
    /// Telegram bot token.
    pub telegram_token: String,
    /// Telegram chat the notifications go to.
    pub telegram_chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("practicum_token", &"[REDACTED]")
            .field("telegram_token", &"[REDACTED]")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    ///
    /// Empty or whitespace-only values count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Missing`] naming every absent variable.
    pub fn from_map(vars: &BTreeMap<String, String>) -> Result<Self, CredentialsError> {
        let mut missing = Vec::new();
        let mut take = |key: &str| -> String {
            match vars.get(key) {
                Some(value) if !value.trim().is_empty() => value.clone(),
                _ => {
                    missing.push(key.to_owned());
                    String::new()
                }
            }
        };

        let practicum_token = take(PRACTICUM_TOKEN);
        let telegram_token = take(TELEGRAM_TOKEN);
        let telegram_chat_id = take(TELEGRAM_CHAT_ID);

        if missing.is_empty() {
            Ok(Self {
                practicum_token,
                telegram_token,
                telegram_chat_id,
            })
        } else {
            Err(CredentialsError::Missing(missing))
        }
    }

    /// Read the three required variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Missing`] naming every absent variable.
    pub fn from_env() -> Result<Self, CredentialsError> {
        let mut vars = BTreeMap::new();
        for key in [PRACTICUM_TOKEN, TELEGRAM_TOKEN, TELEGRAM_CHAT_ID] {
            if let Ok(value) = std::env::var(key) {
                vars.insert(key.to_owned(), value);
            }
        }
        Self::from_map(&vars)
    }
}

/// Merge a runtime `.env` file into the process environment, if present.
///
/// A missing file is not an error; credentials may come from the ambient
/// environment instead. Existing process variables are never overridden.
///
/// # Errors
///
/// Returns an error if the file exists but has broad permissions or cannot
/// be parsed.
pub fn load_env_file(path: &Path) -> Result<(), CredentialsError> {
    if !path.exists() {
        debug!(path = %path.display(), "no credentials file, using process environment");
        return Ok(());
    }

    validate_private_permissions(path)?;

    dotenvy::from_path(path).map_err(|e| CredentialsError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    debug!(path = %path.display(), "merged credentials file into environment");
    Ok(())
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> Result<(), CredentialsError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|e| CredentialsError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode & 0o077 != 0 {
        return Err(CredentialsError::Permissions {
            path: path.display().to_string(),
            mode,
        });
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(_path: &Path) -> Result<(), CredentialsError> {
    Ok(())
}
