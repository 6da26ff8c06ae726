//! Command-line interface
//!
//! Operator surface over the sync core: run one captured notification,
//! inspect the field plan, or check the configuration against the
//! remote boards.

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::AutolinkError;
use crate::errors::Result;
use crate::sync::ChangeNotification;
use crate::Autolink;

#[derive(Parser)]
#[command(name = "autolink", version, about = "Cross-board record synchronization")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file (defaults to config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process one captured webhook payload and print the sync result
    Handle {
        /// JSON file holding the webhook payload
        #[arg(long)]
        payload: PathBuf,
    },
    /// Print the field plan computed for this configuration
    Plan,
    /// Verify the configuration against the remote boards
    Check,
}

/// Load configuration from the CLI-selected path or the default chain.
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
}

pub async fn handle_payload_command(autolink: &Autolink, payload: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(payload)?;
    let document: serde_json::Value = serde_json::from_str(&raw)?;
    let notification = ChangeNotification::from_webhook_payload(&document)?;

    info!(
        record = %notification.record_id,
        board = %notification.board_id,
        event = %notification.event_type,
        "processing notification"
    );

    let result = autolink.handle(&notification).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn handle_plan_command(autolink: &Autolink) -> Result<()> {
    for column in autolink.plan().columns() {
        println!("{column}");
    }
    Ok(())
}

pub async fn handle_check_command(config: &AppConfig) -> Result<()> {
    use crate::store::RecordStore;

    let store = crate::HttpRecordStore::new(
        &config.api.endpoint,
        &config.api.token,
        config.request_timeout(),
    )?;

    let source = store.board_schema(config.sync.source_board()).await?;
    let target = store.board_schema(config.sync.target_board()).await?;

    if source.column(&config.sync.source_id_column()).is_none() {
        return Err(AutolinkError::Config(format!(
            "source board {} has no column {}",
            config.sync.source_board, config.sync.source_id_column
        )));
    }
    if target.column(&config.sync.target_id_column()).is_none() {
        return Err(AutolinkError::Config(format!(
            "target board {} has no column {}",
            config.sync.target_board, config.sync.target_id_column
        )));
    }

    println!(
        "ok: source board {} ({} columns), target board {} ({} columns)",
        source.board,
        source.columns.len(),
        target.board,
        target.columns.len()
    );
    Ok(())
}
