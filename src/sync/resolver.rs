//! Linked-record resolution
//!
//! Maps a source record to its counterpart on the target board through
//! the configured link columns. Resolution is re-done for every
//! notification; a cached mapping could silently misroute an update
//! after the link value changes.

use thiserror::Error;
use tracing::debug;

use crate::board::BoardId;
use crate::board::ColumnId;
use crate::board::RecordId;
use crate::store::RecordStore;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The source record's link column is empty or absent.
    #[error("source record {0} has no link value")]
    NoLinkValue(RecordId),

    /// No record on the target board carries the link value.
    #[error("no record on board {board} has {column} = {value:?}")]
    NoMatch {
        board: BoardId,
        column: ColumnId,
        value: String,
    },

    /// Store failure, including the ambiguous multi-match case.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolves source records to target records via the link columns.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    source_id_column: ColumnId,
    target_board: BoardId,
    target_id_column: ColumnId,
}

impl LinkResolver {
    #[must_use]
    pub fn new(
        source_id_column: ColumnId,
        target_board: BoardId,
        target_id_column: ColumnId,
    ) -> Self {
        Self {
            source_id_column,
            target_board,
            target_id_column,
        }
    }

    /// Resolve the target record for one source record.
    pub async fn resolve<S: RecordStore>(
        &self,
        store: &S,
        source_record: RecordId,
    ) -> Result<RecordId, ResolveError> {
        let link = match store
            .get_column_value(source_record, &self.source_id_column)
            .await
        {
            Ok(raw) => raw,
            Err(StoreError::NotFound { .. }) => {
                return Err(ResolveError::NoLinkValue(source_record))
            }
            Err(other) => return Err(other.into()),
        };

        let value = link
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string)
            .ok_or(ResolveError::NoLinkValue(source_record))?;

        debug!(%source_record, link = %value, "resolving linked record");

        let target = store
            .find_record_by_field(self.target_board, &self.target_id_column, &value)
            .await?
            .ok_or_else(|| ResolveError::NoMatch {
                board: self.target_board,
                column: self.target_id_column.clone(),
                value,
            })?;

        debug!(%source_record, %target, "resolved linked record");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardSchema;
    use crate::board::ColumnDef;
    use crate::board::ColumnType;
    use crate::board::RawColumn;
    use crate::store::MemoryStore;

    const SOURCE_BOARD: BoardId = BoardId(100);
    const TARGET_BOARD: BoardId = BoardId(200);

    fn resolver() -> LinkResolver {
        LinkResolver::new(
            ColumnId::from("text_mkrctj55"),
            TARGET_BOARD,
            ColumnId::from("text_mkregyd5"),
        )
    }

    fn text_column(id: &str, text: &str) -> RawColumn {
        RawColumn {
            id: ColumnId::from(id),
            column_type: ColumnType::Text,
            text: Some(text.to_string()),
            value: Some(serde_json::Value::String(text.to_string())),
        }
    }

    async fn store_with_boards() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_board(BoardSchema::new(
                SOURCE_BOARD,
                vec![ColumnDef::new("text_mkrctj55", "Admin ID", ColumnType::Text)],
            ))
            .await;
        store
            .add_board(BoardSchema::new(
                TARGET_BOARD,
                vec![ColumnDef::new("text_mkregyd5", "Admin ID", ColumnType::Text)],
            ))
            .await;
        store
    }

    #[tokio::test]
    async fn resolves_unique_match() {
        let store = store_with_boards().await;
        store
            .insert_record(
                SOURCE_BOARD,
                RecordId(10),
                vec![text_column("text_mkrctj55", "ID_admin_42")],
            )
            .await;
        store
            .insert_record(
                TARGET_BOARD,
                RecordId(5001),
                vec![text_column("text_mkregyd5", "ID_admin_42")],
            )
            .await;

        let target = resolver().resolve(&store, RecordId(10)).await.unwrap();
        assert_eq!(target, RecordId(5001));
    }

    #[tokio::test]
    async fn empty_link_value_is_no_link() {
        let store = store_with_boards().await;
        store
            .insert_record(
                SOURCE_BOARD,
                RecordId(10),
                vec![RawColumn {
                    id: ColumnId::from("text_mkrctj55"),
                    column_type: ColumnType::Text,
                    text: Some(String::new()),
                    value: None,
                }],
            )
            .await;

        let err = resolver().resolve(&store, RecordId(10)).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoLinkValue(RecordId(10))));
    }

    #[tokio::test]
    async fn absent_link_column_is_no_link() {
        let store = store_with_boards().await;
        store.insert_record(SOURCE_BOARD, RecordId(10), vec![]).await;

        let err = resolver().resolve(&store, RecordId(10)).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoLinkValue(_)));
    }

    #[tokio::test]
    async fn zero_matches_is_no_match() {
        let store = store_with_boards().await;
        store
            .insert_record(
                SOURCE_BOARD,
                RecordId(10),
                vec![text_column("text_mkrctj55", "ID_admin_42")],
            )
            .await;

        let err = resolver().resolve(&store, RecordId(10)).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoMatch { .. }));
    }

    #[tokio::test]
    async fn duplicate_matches_propagate_unchanged() {
        let store = store_with_boards().await;
        store
            .insert_record(
                SOURCE_BOARD,
                RecordId(10),
                vec![text_column("text_mkrctj55", "ID_admin_42")],
            )
            .await;
        for id in [5001, 5002] {
            store
                .insert_record(
                    TARGET_BOARD,
                    RecordId(id),
                    vec![text_column("text_mkregyd5", "ID_admin_42")],
                )
                .await;
        }

        let err = resolver().resolve(&store, RecordId(10)).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Store(StoreError::MultipleMatches { .. })
        ));
    }
}
