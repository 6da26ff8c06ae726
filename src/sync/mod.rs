//! Cross-board synchronization engine
//!
//! Event normalization, linked-record resolution, field-set planning,
//! value transcoding and the clear-then-write apply protocol.

pub mod codec;
pub mod engine;
pub mod planner;
pub mod resolver;
pub mod retry;
pub mod types;

pub use codec::CodecError;
pub use engine::SyncEngine;
pub use planner::FieldPlan;
pub use resolver::LinkResolver;
pub use resolver::ResolveError;
pub use retry::RetryDecision;
pub use retry::RetryPolicy;
pub use types::ChangeNotification;
pub use types::FieldSkip;
pub use types::SkipKind;
pub use types::SkipReason;
pub use types::SyncResult;
pub use types::SyncStatus;
