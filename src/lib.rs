//! `autolink` - cross-board record synchronization
//!
//! Keeps a mirror record on a target board synchronized with its source
//! record on a source board, driven by change notifications. The
//! pipeline per notification: normalize the event, resolve the linked
//! target record through the configured link columns, compute the
//! propagation field set, read and transcode the source values, then
//! clear-and-write them to the target with bounded retry on transient
//! remote failures.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use autolink::{AppConfig, Autolink, ChangeNotification};
//!
//! # async fn run() -> autolink::Result<()> {
//! let config = AppConfig::load()?;
//! let autolink = Autolink::connect(&config).await?;
//!
//! let payload = serde_json::json!({
//!     "event": { "type": "update_column_value", "pulseId": 10974880446u64, "boardId": 100 }
//! });
//! let notification = ChangeNotification::from_webhook_payload(&payload)?;
//! let result = autolink.handle(&notification).await;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub mod board;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod store;
pub mod sync;

pub use board::BoardId;
pub use board::BoardSchema;
pub use board::ColumnDef;
pub use board::ColumnId;
pub use board::ColumnType;
pub use board::ColumnValue;
pub use board::RecordId;
pub use config::AppConfig;
pub use errors::AutolinkError;
pub use errors::Result;
pub use store::HttpRecordStore;
pub use store::MemoryStore;
pub use store::RecordStore;
pub use store::StoreError;
pub use sync::ChangeNotification;
pub use sync::FieldPlan;
pub use sync::SyncEngine;
pub use sync::SyncResult;
pub use sync::SyncStatus;

/// Configured sync engine bound to the remote HTTP store.
pub struct Autolink {
    engine: SyncEngine<HttpRecordStore>,
}

impl Autolink {
    /// Build the HTTP store, fetch both board schemas and prepare the
    /// field plan.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let store = HttpRecordStore::new(
            &config.api.endpoint,
            &config.api.token,
            config.request_timeout(),
        )?;
        let engine = SyncEngine::load(Arc::new(store), config.sync.clone()).await?;
        Ok(Self { engine })
    }

    /// Process one change notification.
    pub async fn handle(&self, notification: &ChangeNotification) -> SyncResult {
        self.engine.handle(notification).await
    }

    /// The field plan computed for this configuration.
    #[must_use]
    pub fn plan(&self) -> &FieldPlan {
        self.engine.plan()
    }
}
