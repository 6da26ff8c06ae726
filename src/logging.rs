//! Logging setup

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Initialize logging from configuration.
pub fn init(config: &LoggingConfig) -> Result<()> {
    init_with_level(&config.level)
}

/// Initialize logging with an explicit level for the crate's own spans,
/// keeping third-party HTTP internals quiet.
pub fn init_with_level(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,autolink={level},hyper=warn,reqwest=warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!(level, "logging initialized");
    Ok(())
}
