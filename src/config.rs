//! Configuration management
//!
//! Loads and validates application configuration from TOML files. The
//! configuration is constructed once at process start and passed by
//! reference into the engine; there is no ambient global state.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::board::BoardId;
use crate::board::ColumnId;
use crate::errors::AutolinkError;
use crate::errors::Result;
use crate::sync::RetryPolicy;

/// Remote API access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.monday.com/v2".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Sync pair configuration: which boards, which link columns, which
/// fields to leave alone. Immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    pub source_board: u64,
    pub target_board: u64,
    pub source_id_column: String,
    pub target_id_column: String,
    /// Column ids never propagated. Duplicates collapse; order is
    /// irrelevant.
    #[serde(default)]
    pub excluded_columns: BTreeSet<String>,
    /// Webhook event types that trigger a sync.
    #[serde(default = "default_trigger_events")]
    pub trigger_events: Vec<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_trigger_events() -> Vec<String> {
    vec![
        "update_column_value".to_string(),
        "change_column_value".to_string(),
    ]
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl SyncSettings {
    #[must_use]
    pub const fn source_board(&self) -> BoardId {
        BoardId(self.source_board)
    }

    #[must_use]
    pub const fn target_board(&self) -> BoardId {
        BoardId(self.target_board)
    }

    #[must_use]
    pub fn source_id_column(&self) -> ColumnId {
        ColumnId::new(self.source_id_column.clone())
    }

    #[must_use]
    pub fn target_id_column(&self) -> ColumnId {
        ColumnId::new(self.target_id_column.clone())
    }

    #[must_use]
    pub fn excluded_column_ids(&self) -> BTreeSet<ColumnId> {
        self.excluded_columns
            .iter()
            .map(|c| ColumnId::new(c.clone()))
            .collect()
    }

    /// Whether this event type triggers a sync.
    #[must_use]
    pub fn is_trigger(&self, event_type: &str) -> bool {
        self.trigger_events.iter().any(|t| t == event_type)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub backtrace: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            backtrace: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub sync: SyncSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// File I/O errors, TOML parsing errors and validation failures.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `config.toml`, falling back to `config.example.toml`.
    pub fn load() -> Result<Self> {
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "using config.example.toml; create config.toml for production use"
            );
            Self::from_file("config.example.toml")
        } else {
            Err(AutolinkError::Config(
                "no config file found; create config.toml or config.example.toml".to_string(),
            ))
        }
    }

    /// Reject configurations the engine cannot run safely with.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(AutolinkError::Config(msg.to_string()));

        if self.api.token.trim().is_empty() {
            return fail("api.token must not be empty");
        }
        if self.api.endpoint.trim().is_empty() {
            return fail("api.endpoint must not be empty");
        }
        if self.sync.source_board == 0 || self.sync.target_board == 0 {
            return fail("sync board ids must be non-zero");
        }
        if self.sync.source_id_column.trim().is_empty()
            || self.sync.target_id_column.trim().is_empty()
        {
            return fail("sync link column ids must not be empty");
        }
        if self.sync.source_board == self.sync.target_board
            && self.sync.source_id_column == self.sync.target_id_column
        {
            return fail("source and target must not be the same board column pair");
        }
        if self.sync.max_retries == 0 {
            return fail("sync.max_retries must be at least 1");
        }
        if self.sync.trigger_events.is_empty() {
            return fail("sync.trigger_events must not be empty");
        }
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> String {
        r#"
[api]
token = "secret-token"

[sync]
source_board = 100
target_board = 200
source_id_column = "text_mkrctj55"
target_id_column = "text_mkregyd5"
excluded_columns = ["name", "name"]
"#
        .to_string()
    }

    #[test]
    fn loads_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api.endpoint, "https://api.monday.com/v2");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.sync.max_retries, 3);
        assert!(config.sync.is_trigger("update_column_value"));
        assert!(!config.sync.is_trigger("create_pulse"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn excluded_duplicates_collapse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sync.excluded_columns.len(), 1);
        assert!(config
            .sync
            .excluded_column_ids()
            .contains(&ColumnId::from("name")));
    }

    #[test]
    fn rejects_empty_token() {
        let toml = sample_toml().replace("secret-token", " ");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        assert!(AppConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn rejects_identical_board_column_pair() {
        let toml = sample_toml()
            .replace("target_board = 200", "target_board = 100")
            .replace("text_mkregyd5", "text_mkrctj55");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        assert!(AppConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn retry_policy_from_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_toml().as_bytes()).unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();

        let policy = config.sync.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }
}
