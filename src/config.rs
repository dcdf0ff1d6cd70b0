//! Runtime configuration and path resolution.
//!
//! Tunables live in an optional `~/.hwwatch/config.toml`; every field has a
//! default so the file can be absent entirely. Credentials never appear in
//! the TOML; they are environment-only (see [`crate::credentials`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Review API endpoint queried every cycle.
pub const DEFAULT_ENDPOINT: &str =
    "https://practicum.yandex.ru/api/user_api/homework_statuses/";

/// Top-level runtime configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Polling loop tunables.
    #[serde(default)]
    pub poll: PollConfig,
}

/// Polling loop tunables.
#[derive(Debug, Deserialize)]
pub struct PollConfig {
    /// Seconds to sleep between cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Timeout applied to every outbound HTTP request, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Review API endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl PollConfig {
    /// Sleep duration between cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Timeout for outbound HTTP requests.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            endpoint: default_endpoint(),
        }
    }
}

// Default value functions for serde

fn default_interval_secs() -> u64 {
    600
}
fn default_http_timeout_secs() -> u64 {
    30
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}

/// Filesystem locations used at runtime, all under `~/.hwwatch/`.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    /// Root runtime directory.
    pub root: PathBuf,
    /// Optional `.env` file with credentials.
    pub env_file: PathBuf,
    /// Optional TOML configuration file.
    pub config_file: PathBuf,
    /// Directory for rotated JSON logs.
    pub logs_dir: PathBuf,
}

/// Resolve the runtime directory layout under the user's home.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    let root = home.home_dir().join(".hwwatch");
    Ok(RuntimePaths {
        env_file: root.join(".env"),
        config_file: root.join("config.toml"),
        logs_dir: root.join("logs"),
        root,
    })
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Load configuration from `path`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}
