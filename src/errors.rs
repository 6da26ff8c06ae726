use thiserror::Error;

use crate::store::StoreError;

/// Top-level error type for the outer surfaces (config loading, CLI,
/// engine construction). The sync path itself reports per-notification
/// outcomes through `SyncResult` instead of bubbling errors.
#[derive(Debug, Error)]
pub enum AutolinkError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("malformed notification: {0}")]
    Notification(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AutolinkError>;
