//! Remote record store access
//!
//! The [`RecordStore`] trait is the seam between the sync engine and the
//! remote board service. [`HttpRecordStore`] speaks the remote's GraphQL
//! query/mutation protocol; [`MemoryStore`] is an in-memory backend for
//! tests and development.
//!
//! The store performs no caching of record state: the remote is the
//! single source of truth and values may change between calls.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::board::BoardId;
use crate::board::BoardSchema;
use crate::board::ColumnId;
use crate::board::RawColumn;
use crate::board::RecordId;

pub mod http;
pub mod memory;

pub use http::HttpRecordStore;
pub use memory::MemoryStore;
pub use memory::StoreCall;

/// Failures raised by record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record, or one of its columns, does not exist.
    #[error("record {record} not found{}", column.as_ref().map(|c| format!(" (column {c})")).unwrap_or_default())]
    NotFound {
        record: RecordId,
        column: Option<ColumnId>,
    },

    /// A field lookup matched more than one record. Ambiguous link data
    /// is a data-quality fault, never resolved by picking the first hit.
    #[error("{} records on board {board} have {column} = {value:?}: {matches:?}", matches.len())]
    MultipleMatches {
        board: BoardId,
        column: ColumnId,
        value: String,
        matches: Vec<RecordId>,
    },

    /// The remote service rejected or failed the call.
    #[error("remote error (status {status}, retryable: {retryable}): {message}")]
    Remote {
        status: u16,
        retryable: bool,
        message: String,
    },

    /// The call did not complete within the configured timeout.
    #[error("remote call timed out")]
    Timeout,

    /// The remote answered with a payload this client cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Remote { retryable, .. } => *retryable,
            _ => false,
        }
    }

    pub(crate) fn record_not_found(record: RecordId) -> Self {
        Self::NotFound {
            record,
            column: None,
        }
    }

    pub(crate) fn column_not_found(record: RecordId, column: ColumnId) -> Self {
        Self::NotFound {
            record,
            column: Some(column),
        }
    }
}

/// Typed interface to the remote board service's queries and mutations.
///
/// Every mutating call is a remote write. Implementations must never
/// silently narrow a multi-record match down to one (`find_record_by_field`
/// fails with [`StoreError::MultipleMatches`] instead).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the full column schema of a board.
    async fn board_schema(&self, board: BoardId) -> Result<BoardSchema, StoreError>;

    /// Read a single field of a record.
    async fn get_column_value(
        &self,
        record: RecordId,
        column: &ColumnId,
    ) -> Result<RawColumn, StoreError>;

    /// Batched read of several fields of one record.
    ///
    /// Fails with [`StoreError::NotFound`] when the record itself is
    /// absent. A requested column the record carries no entry for is
    /// absent from the returned map; callers must account for each such
    /// absence explicitly rather than dropping it.
    async fn get_record_values(
        &self,
        record: RecordId,
        columns: &[ColumnId],
    ) -> Result<BTreeMap<ColumnId, RawColumn>, StoreError>;

    /// Find the record on `board` whose `column` equals `value`.
    ///
    /// Returns `Ok(None)` when nothing matches and
    /// [`StoreError::MultipleMatches`] when more than one record does.
    async fn find_record_by_field(
        &self,
        board: BoardId,
        column: &ColumnId,
        value: &str,
    ) -> Result<Option<RecordId>, StoreError>;

    /// Reset each listed column of a record to its empty representation.
    async fn clear_columns(
        &self,
        board: BoardId,
        record: RecordId,
        columns: &[ColumnId],
    ) -> Result<(), StoreError>;

    /// Write the given wire values to a record's columns in one call.
    async fn set_columns(
        &self,
        board: BoardId,
        record: RecordId,
        values: &BTreeMap<ColumnId, serde_json::Value>,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_classification() {
        assert!(StoreError::Timeout.is_retryable());
        assert!(StoreError::Remote {
            status: 429,
            retryable: true,
            message: "rate limited".into()
        }
        .is_retryable());
        assert!(!StoreError::Remote {
            status: 401,
            retryable: false,
            message: "bad token".into()
        }
        .is_retryable());
        assert!(!StoreError::record_not_found(RecordId(1)).is_retryable());
        assert!(!StoreError::Protocol("garbage".into()).is_retryable());
    }
}
