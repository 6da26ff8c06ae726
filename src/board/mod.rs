//! Board and column domain model
//!
//! Boards, column definitions and field values as the remote store
//! presents them. Schemas are loaded once at startup and treated as
//! read-only configuration for the life of the process.

pub mod column;
pub mod value;

pub use column::BoardId;
pub use column::BoardSchema;
pub use column::ColumnDef;
pub use column::ColumnId;
pub use column::ColumnType;
pub use column::RecordId;
pub use value::ColumnValue;
pub use value::DateValue;
pub use value::RawColumn;
