//! GraphQL client for the remote board service

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use serde_json::Value;
use tracing::debug;

use super::RecordStore;
use super::StoreError;
use crate::board::BoardId;
use crate::board::BoardSchema;
use crate::board::ColumnDef;
use crate::board::ColumnId;
use crate::board::ColumnType;
use crate::board::RawColumn;
use crate::board::RecordId;

const SCHEMA_QUERY: &str = "
query ($board_id: [ID!]) {
  boards (ids: $board_id) {
    id
    columns { id title type settings_str }
  }
}";

const RECORD_VALUES_QUERY: &str = "
query ($item_id: [ID!], $column_ids: [String!]) {
  items (ids: $item_id) {
    id
    column_values (ids: $column_ids) { id type text value }
  }
}";

const FIND_BY_FIELD_QUERY: &str = "
query ($board_id: ID!, $column_id: String!, $value: String!, $limit: Int!) {
  items_page_by_column_values(
    board_id: $board_id
    limit: $limit
    columns: [{ column_id: $column_id, column_values: [$value] }]
  ) {
    items { id }
  }
}";

const SET_COLUMNS_MUTATION: &str = "
mutation ($board_id: ID!, $item_id: ID!, $column_values: JSON!) {
  change_multiple_column_values(
    board_id: $board_id
    item_id: $item_id
    column_values: $column_values
  ) { id }
}";

/// How many matches the link lookup asks for. Anything above one is
/// already a data-quality fault, so a small page is enough.
const FIND_LIMIT: u32 = 10;

/// Record store backed by the remote service's GraphQL endpoint.
///
/// Mirrors the remote's own query surface: `items`/`column_values` for
/// reads, `items_page_by_column_values` for field lookups and
/// `change_multiple_column_values` for writes. Holds no record state.
#[derive(Clone)]
pub struct HttpRecordStore {
    client: Client,
    endpoint: String,
    token: String,
}

impl HttpRecordStore {
    /// Build a client with the given endpoint, auth token and
    /// per-request timeout.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| StoreError::Protocol(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// POST one GraphQL document and return the `data` payload.
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            // 429 and server-side failures are worth retrying; the rest
            // (bad token, malformed query) are not.
            let retryable = status.as_u16() == 429 || status.is_server_error();
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Remote {
                status: status.as_u16(),
                retryable,
                message,
            });
        }

        let body: Value = response.json().await.map_err(map_transport_error)?;

        if let Some(errors) = body.get("errors") {
            let message = errors.to_string();
            // The remote reports throttling as a GraphQL-level error on
            // an HTTP 200 response.
            let lowered = message.to_lowercase();
            let retryable = lowered.contains("complexity") || lowered.contains("rate limit");
            return Err(StoreError::Remote {
                status: status.as_u16(),
                retryable,
                message,
            });
        }

        body.get("data")
            .cloned()
            .ok_or_else(|| StoreError::Protocol("response missing 'data'".to_string()))
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn board_schema(&self, board: BoardId) -> Result<BoardSchema, StoreError> {
        let data = self
            .graphql(SCHEMA_QUERY, json!({ "board_id": [board.0.to_string()] }))
            .await?;

        let boards = data
            .get("boards")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Protocol("boards payload missing".to_string()))?;
        let entry = boards.first().ok_or_else(|| StoreError::Protocol(format!(
            "board {board} not visible to this token"
        )))?;

        let raw_columns = entry
            .get("columns")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Protocol("board columns missing".to_string()))?;

        let mut columns = Vec::with_capacity(raw_columns.len());
        for column in raw_columns {
            let id = column
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::Protocol("column without id".to_string()))?;
            let title = column
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(id)
                .to_string();
            let tag = column.get("type").and_then(Value::as_str).unwrap_or("");
            let column_type: ColumnType =
                serde_json::from_value(Value::String(tag.to_string()))
                    .unwrap_or(ColumnType::Unknown);
            let options = column
                .get("settings_str")
                .and_then(Value::as_str)
                .map(|s| parse_option_labels(s, column_type))
                .unwrap_or_default();

            columns.push(ColumnDef {
                id: ColumnId::new(id),
                title,
                column_type,
                options,
            });
        }

        debug!(%board, columns = columns.len(), "fetched board schema");
        Ok(BoardSchema::new(board, columns))
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
        let ids: Vec<String> = columns.iter().map(|c| c.0.clone()).collect();
        let data = self
            .graphql(
                RECORD_VALUES_QUERY,
                json!({ "item_id": [record.0.to_string()], "column_ids": ids }),
            )
            .await?;

        let items = data
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Protocol("items payload missing".to_string()))?;
        let item = items
            .first()
            .ok_or_else(|| StoreError::record_not_found(record))?;

        let mut out = BTreeMap::new();
        for raw in item
            .get("column_values")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let parsed = parse_raw_column(raw)?;
            out.insert(parsed.id.clone(), parsed);
        }
        Ok(out)
    }

    async fn find_record_by_field(
        &self,
        board: BoardId,
        column: &ColumnId,
        value: &str,
    ) -> Result<Option<RecordId>, StoreError> {
        let data = self
            .graphql(
                FIND_BY_FIELD_QUERY,
                json!({
                    "board_id": board.0.to_string(),
                    "column_id": column.0,
                    "value": value,
                    "limit": FIND_LIMIT,
                }),
            )
            .await?;

        let items = data
            .get("items_page_by_column_values")
            .and_then(|p| p.get("items"))
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Protocol("items_page payload missing".to_string()))?;

        let mut matches = Vec::with_capacity(items.len());
        for item in items {
            matches.push(parse_record_id(item.get("id"))?);
        }

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
        // The remote clears a column when its value is written as "".
        let empties: BTreeMap<ColumnId, Value> = columns
            .iter()
            .map(|c| (c.clone(), Value::String(String::new())))
            .collect();
        self.set_columns(board, record, &empties).await
    }

    async fn set_columns(
        &self,
        board: BoardId,
        record: RecordId,
        values: &BTreeMap<ColumnId, Value>,
    ) -> Result<(), StoreError> {
        let payload: serde_json::Map<String, Value> = values
            .iter()
            .map(|(id, v)| (id.0.clone(), v.clone()))
            .collect();
        // change_multiple_column_values takes the column map as a
        // JSON-encoded string, not an inline object.
        let encoded = serde_json::to_string(&Value::Object(payload))
            .map_err(|e| StoreError::Protocol(format!("failed to encode column values: {e}")))?;

        self.graphql(
            SET_COLUMNS_MUTATION,
            json!({
                "board_id": board.0.to_string(),
                "item_id": record.0.to_string(),
                "column_values": encoded,
            }),
        )
        .await?;

        debug!(%board, %record, columns = values.len(), "wrote column values");
        Ok(())
    }
}

fn map_transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else if e.is_connect() {
        StoreError::Remote {
            status: 0,
            retryable: true,
            message: format!("connection failed: {e}"),
        }
    } else {
        StoreError::Protocol(e.to_string())
    }
}

/// Parse one `column_values` entry. The remote double-encodes `value`
/// as a JSON string inside the response document.
fn parse_raw_column(raw: &Value) -> Result<RawColumn, StoreError> {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Protocol("column value without id".to_string()))?;
    let tag = raw.get("type").and_then(Value::as_str).unwrap_or("");
    let column_type: ColumnType = serde_json::from_value(Value::String(tag.to_string()))
        .unwrap_or(ColumnType::Unknown);
    let text = raw
        .get("text")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let value = match raw.get("value") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => {
            Some(serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())))
        }
        Some(other) => Some(other.clone()),
    };

    Ok(RawColumn {
        id: ColumnId::new(id),
        column_type,
        text,
        value,
    })
}

fn parse_record_id(value: Option<&Value>) -> Result<RecordId, StoreError> {
    match value {
        Some(Value::String(s)) => s
            .parse::<u64>()
            .map(RecordId)
            .map_err(|_| StoreError::Protocol(format!("unparseable record id {s:?}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(RecordId)
            .ok_or_else(|| StoreError::Protocol(format!("unparseable record id {n}"))),
        _ => Err(StoreError::Protocol("record without id".to_string())),
    }
}

/// Extract option labels from a `status`/`dropdown` column's
/// `settings_str`. Status columns carry `{"labels": {"0": "Done", ...}}`
/// keyed by index; dropdowns carry `{"labels": [{"id": 1, "name": ...}]}`.
fn parse_option_labels(settings: &str, column_type: ColumnType) -> Vec<String> {
    if !matches!(column_type, ColumnType::Status | ColumnType::Dropdown) {
        return Vec::new();
    }
    let Ok(parsed) = serde_json::from_str::<Value>(settings) else {
        return Vec::new();
    };
    match parsed.get("labels") {
        Some(Value::Object(map)) => {
            let mut indexed: Vec<(u64, String)> = map
                .iter()
                .filter_map(|(k, v)| {
                    let index = k.parse::<u64>().ok()?;
                    let label = v.as_str()?.to_string();
                    Some((index, label))
                })
                .collect();
            indexed.sort_by_key(|(index, _)| *index);
            indexed.into_iter().map(|(_, label)| label).collect()
        }
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|e| e.get("name").and_then(Value::as_str))
            .map(ToString::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
