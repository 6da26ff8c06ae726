//! In-memory record store for tests and development
//!
//! Holds boards and records behind an async lock, records every call it
//! receives so tests can assert on exactly which remote operations a
//! sync performed, and supports scripted failures on mutating calls to
//! exercise the retry path.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::RecordStore;
use super::StoreError;
use crate::board::BoardId;
use crate::board::BoardSchema;
use crate::board::ColumnId;
use crate::board::RawColumn;
use crate::board::RecordId;

/// One observed store call, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    BoardSchema {
        board: BoardId,
    },
    GetRecordValues {
        record: RecordId,
        columns: Vec<ColumnId>,
    },
    FindByField {
        board: BoardId,
        column: ColumnId,
        value: String,
    },
    ClearColumns {
        board: BoardId,
        record: RecordId,
        columns: Vec<ColumnId>,
    },
    SetColumns {
        board: BoardId,
        record: RecordId,
        columns: Vec<ColumnId>,
    },
}

impl StoreCall {
    /// Whether this call writes to the remote.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(self, Self::ClearColumns { .. } | Self::SetColumns { .. })
    }
}

#[derive(Debug, Default)]
struct BoardState {
    schema: Option<BoardSchema>,
    records: BTreeMap<RecordId, BTreeMap<ColumnId, RawColumn>>,
}

#[derive(Debug, Default)]
struct Inner {
    boards: BTreeMap<BoardId, BoardState>,
    calls: Vec<StoreCall>,
    set_failures: VecDeque<StoreError>,
    clear_failures: VecDeque<StoreError>,
}

/// In-memory [`RecordStore`] backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a board with its schema.
    pub async fn add_board(&self, schema: BoardSchema) {
        let mut inner = self.inner.write().await;
        let board = schema.board;
        inner.boards.entry(board).or_default().schema = Some(schema);
    }

    /// Insert (or replace) a record with the given field snapshots.
    pub async fn insert_record(&self, board: BoardId, record: RecordId, values: Vec<RawColumn>) {
        let mut inner = self.inner.write().await;
        let fields = values.into_iter().map(|v| (v.id.clone(), v)).collect();
        inner
            .boards
            .entry(board)
            .or_default()
            .records
            .insert(record, fields);
    }

    /// Script a failure for the next `set_columns` call. Queued failures
    /// are consumed in order before any write is applied.
    pub async fn fail_next_set(&self, error: StoreError) {
        self.inner.write().await.set_failures.push_back(error);
    }

    /// Script a failure for the next `clear_columns` call.
    pub async fn fail_next_clear(&self, error: StoreError) {
        self.inner.write().await.clear_failures.push_back(error);
    }

    /// All calls observed so far, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.inner.read().await.calls.clone()
    }

    /// Only the mutating calls observed so far.
    pub async fn mutating_calls(&self) -> Vec<StoreCall> {
        self.inner
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .cloned()
            .collect()
    }

    /// Current snapshot of one field, if present.
    pub async fn record_column(
        &self,
        board: BoardId,
        record: RecordId,
        column: &ColumnId,
    ) -> Option<RawColumn> {
        self.inner
            .read()
            .await
            .boards
            .get(&board)
            .and_then(|b| b.records.get(&record))
            .and_then(|r| r.get(column))
            .cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn board_schema(&self, board: BoardId) -> Result<BoardSchema, StoreError> {
        let mut inner = self.inner.write().await;
        inner.calls.push(StoreCall::BoardSchema { board });
        inner
            .boards
            .get(&board)
            .and_then(|b| b.schema.clone())
            .ok_or_else(|| StoreError::Protocol(format!("no schema registered for board {board}")))
    }

    async fn get_column_value(
        &self,
        record: RecordId,
        column: &ColumnId,
    ) -> Result<RawColumn, StoreError> {
        let mut values = self.get_record_values(record, &[column.clone()]).await?;
        values
            .remove(column)
            .ok_or_else(|| StoreError::column_not_found(record, column.clone()))
    }

    async fn get_record_values(
        &self,
        record: RecordId,
        columns: &[ColumnId],
    ) -> Result<BTreeMap<ColumnId, RawColumn>, StoreError> {
        let mut inner = self.inner.write().await;
        inner.calls.push(StoreCall::GetRecordValues {
            record,
            columns: columns.to_vec(),
        });

        let fields = inner
            .boards
            .values()
            .find_map(|b| b.records.get(&record))
            .ok_or_else(|| StoreError::record_not_found(record))?;

        Ok(columns
            .iter()
            .filter_map(|c| fields.get(c).map(|raw| (c.clone(), raw.clone())))
            .collect())
    }

    async fn find_record_by_field(
        &self,
        board: BoardId,
        column: &ColumnId,
        value: &str,
    ) -> Result<Option<RecordId>, StoreError> {
        let mut inner = self.inner.write().await;
        inner.calls.push(StoreCall::FindByField {
            board,
            column: column.clone(),
            value: value.to_string(),
        });

        let Some(state) = inner.boards.get(&board) else {
            return Ok(None);
        };

        let matches: Vec<RecordId> = state
            .records
            .iter()
            .filter(|(_, fields)| {
                fields
                    .get(column)
                    .and_then(|raw| raw.text.as_deref())
                    .is_some_and(|text| text == value)
            })
            .map(|(id, _)| *id)
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(StoreError::MultipleMatches {
                board,
                column: column.clone(),
                value: value.to_string(),
                matches,
            }),
        }
    }

    async fn clear_columns(
        &self,
        board: BoardId,
        record: RecordId,
        columns: &[ColumnId],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.calls.push(StoreCall::ClearColumns {
            board,
            record,
            columns: columns.to_vec(),
        });
        if let Some(error) = inner.clear_failures.pop_front() {
            return Err(error);
        }

        let state = inner
            .boards
            .get_mut(&board)
            .ok_or_else(|| StoreError::record_not_found(record))?;
        let fields = state
            .records
            .get_mut(&record)
            .ok_or_else(|| StoreError::record_not_found(record))?;

        for column in columns {
            if let Some(raw) = fields.get_mut(column) {
                raw.text = None;
                raw.value = None;
            }
        }
        Ok(())
    }

    async fn set_columns(
        &self,
        board: BoardId,
        record: RecordId,
        values: &BTreeMap<ColumnId, Value>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.calls.push(StoreCall::SetColumns {
            board,
            record,
            columns: values.keys().cloned().collect(),
        });
        if let Some(error) = inner.set_failures.pop_front() {
            return Err(error);
        }

        let state = inner
            .boards
            .get_mut(&board)
            .ok_or_else(|| StoreError::record_not_found(record))?;
        let schema = state.schema.clone();
        let fields = state
            .records
            .get_mut(&record)
            .ok_or_else(|| StoreError::record_not_found(record))?;

        for (column, wire) in values {
            let column_type = schema
                .as_ref()
                .and_then(|s| s.column(column))
                .map(|def| def.column_type)
                .or_else(|| fields.get(column).map(|raw| raw.column_type));
            let Some(column_type) = column_type else {
                return Err(StoreError::column_not_found(record, column.clone()));
            };

            let cleared = matches!(wire, Value::String(s) if s.is_empty());
            fields.insert(
                column.clone(),
                RawColumn {
                    id: column.clone(),
                    column_type,
                    text: if cleared { None } else { rendered_text(wire) },
                    value: if cleared { None } else { Some(wire.clone()) },
                },
            );
        }
        Ok(())
    }
}

/// Derive the human-readable `text` rendering the remote would report
/// for a written wire value.
fn rendered_text(wire: &Value) -> Option<String> {
    match wire {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            if let Some(label) = map.get("label").and_then(Value::as_str) {
                return Some(label.to_string());
            }
            if let Some(labels) = map.get("labels").and_then(Value::as_array) {
                let joined: Vec<&str> = labels.iter().filter_map(Value::as_str).collect();
                return Some(joined.join(", "));
            }
            if let Some(date) = map.get("date").and_then(Value::as_str) {
                return match map.get("time").and_then(Value::as_str) {
                    Some(time) => Some(format!("{date} {time}")),
                    None => Some(date.to_string()),
                };
            }
            if let Some(checked) = map.get("checked").and_then(Value::as_str) {
                return Some(if checked == "true" { "v" } else { "" }.to_string());
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ColumnDef;
    use crate::board::ColumnType;

    fn text_column(id: &str, text: &str) -> RawColumn {
        RawColumn {
            id: ColumnId::from(id),
            column_type: ColumnType::Text,
            text: Some(text.to_string()),
            value: Some(Value::String(text.to_string())),
        }
    }

    #[tokio::test]
    async fn registered_schema_is_returned() {
        let store = MemoryStore::new();
        let board = BoardId(7);
        let schema = BoardSchema::new(
            board,
            vec![ColumnDef::new("text_ref", "Ref", ColumnType::Text)],
        );
        store.add_board(schema.clone()).await;

        let fetched = store.board_schema(board).await.unwrap();
        assert_eq!(fetched, schema);
        assert!(store.board_schema(BoardId(8)).await.is_err());
    }

    #[tokio::test]
    async fn find_by_field_distinguishes_zero_one_many() {
        let store = MemoryStore::new();
        let board = BoardId(7);
        let column = ColumnId::from("text_ref");
        store
            .add_board(BoardSchema::new(
                board,
                vec![ColumnDef::new("text_ref", "Ref", ColumnType::Text)],
            ))
            .await;

        assert_eq!(
            store.find_record_by_field(board, &column, "A").await.unwrap(),
            None
        );

        store
            .insert_record(board, RecordId(1), vec![text_column("text_ref", "A")])
            .await;
        assert_eq!(
            store.find_record_by_field(board, &column, "A").await.unwrap(),
            Some(RecordId(1))
        );

        store
            .insert_record(board, RecordId(2), vec![text_column("text_ref", "A")])
            .await;
        let err = store
            .find_record_by_field(board, &column, "A")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MultipleMatches { ref matches, .. } if matches.len() == 2));
    }

    #[tokio::test]
    async fn clear_then_set_updates_snapshot() {
        let store = MemoryStore::new();
        let board = BoardId(7);
        let record = RecordId(1);
        store
            .add_board(BoardSchema::new(
                board,
                vec![ColumnDef::new("status", "Status", ColumnType::Status)
                    .with_options(vec!["Done".into(), "Stuck".into()])],
            ))
            .await;
        store
            .insert_record(
                board,
                record,
                vec![RawColumn {
                    id: ColumnId::from("status"),
                    column_type: ColumnType::Status,
                    text: Some("Stuck".into()),
                    value: Some(serde_json::json!({"index": 2})),
                }],
            )
            .await;

        let column = ColumnId::from("status");
        store
            .clear_columns(board, record, &[column.clone()])
            .await
            .unwrap();
        let raw = store.record_column(board, record, &column).await.unwrap();
        assert!(raw.is_empty());

        let mut values = BTreeMap::new();
        values.insert(column.clone(), serde_json::json!({"label": "Done"}));
        store.set_columns(board, record, &values).await.unwrap();
        let raw = store.record_column(board, record, &column).await.unwrap();
        assert_eq!(raw.text.as_deref(), Some("Done"));
    }

    #[tokio::test]
    async fn scripted_set_failure_is_consumed_in_order() {
        let store = MemoryStore::new();
        let board = BoardId(7);
        let record = RecordId(1);
        store
            .add_board(BoardSchema::new(
                board,
                vec![ColumnDef::new("text_a", "A", ColumnType::Text)],
            ))
            .await;
        store
            .insert_record(board, record, vec![text_column("text_a", "before")])
            .await;
        store
            .fail_next_set(StoreError::Remote {
                status: 429,
                retryable: true,
                message: "rate limited".into(),
            })
            .await;

        let mut values = BTreeMap::new();
        values.insert(ColumnId::from("text_a"), Value::String("after".into()));

        let err = store.set_columns(board, record, &values).await.unwrap_err();
        assert!(err.is_retryable());
        // Failed attempt must not have applied the write.
        let raw = store
            .record_column(board, record, &ColumnId::from("text_a"))
            .await
            .unwrap();
        assert_eq!(raw.text.as_deref(), Some("before"));

        store.set_columns(board, record, &values).await.unwrap();
        assert_eq!(store.mutating_calls().await.len(), 2);
    }
}
