//! Notification and result types for the sync engine

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::board::BoardId;
use crate::board::ColumnId;
use crate::board::RecordId;
use crate::errors::AutolinkError;

/// One inbound change event, normalized from the ingress layer's
/// webhook envelope. Consumed once, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub event_type: String,
    pub record_id: RecordId,
    pub board_id: BoardId,
    #[serde(default)]
    pub column_id: Option<ColumnId>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChangeNotification {
    /// Normalize the remote's webhook envelope into a notification.
    ///
    /// The envelope nests everything under `event`: `type`, `pulseId`
    /// (the record), `boardId`, optionally `columnId` and
    /// `triggerTime`. The `{"challenge": …}` handshake body belongs to
    /// the ingress layer and is rejected here.
    pub fn from_webhook_payload(payload: &Value) -> Result<Self, AutolinkError> {
        let event = payload
            .get("event")
            .ok_or_else(|| AutolinkError::Notification("payload has no 'event' object".into()))?;

        let event_type = event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let record_id = parse_id(event.get("pulseId"))
            .ok_or_else(|| AutolinkError::Notification("event has no usable 'pulseId'".into()))?;
        let board_id = parse_id(event.get("boardId"))
            .ok_or_else(|| AutolinkError::Notification("event has no usable 'boardId'".into()))?;
        let column_id = event
            .get("columnId")
            .and_then(Value::as_str)
            .map(ColumnId::new);
        let timestamp = event
            .get("triggerTime")
            .and_then(Value::as_str)
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(Self {
            event_type,
            record_id: RecordId(record_id),
            board_id: BoardId(board_id),
            column_id,
            timestamp,
        })
    }
}

fn parse_id(value: Option<&Value>) -> Option<u64> {
    match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

/// Why a notification was skipped without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Event type or board did not match the configuration.
    UnrecognizedEvent,
    /// The source record carries no link value.
    NoLinkValue,
    /// No target record matches the link value.
    NoMatch,
}

/// Why an individual field was dropped from the write set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    /// The source record has no value for a planned column, or the
    /// column does not exist on the target board.
    NotFound,
    /// The selected option label has no counterpart on the target.
    OptionMismatch,
    /// No codec exists for the column's type.
    UnsupportedType,
    /// The source value's shape did not match its declared type.
    Malformed,
}

/// One field dropped from the write set, with its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSkip {
    pub column: ColumnId,
    pub reason: SkipKind,
}

/// Overall outcome of one `handle` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum SyncStatus {
    Success,
    Skipped(SkipReason),
    Failed,
}

/// Report returned to the caller for one notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub source: RecordId,
    #[serde(default)]
    pub target: Option<RecordId>,
    /// Fields the plan asked to propagate.
    pub attempted: usize,
    /// Fields actually written to the target.
    pub written: usize,
    /// Fields dropped from the write set, in plan order.
    #[serde(default)]
    pub skipped: Vec<FieldSkip>,
    /// Human-readable detail, set for skips and failures.
    #[serde(default)]
    pub detail: Option<String>,
}

impl SyncResult {
    #[must_use]
    pub fn skipped(source: RecordId, reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Skipped(reason),
            source,
            target: None,
            attempted: 0,
            written: 0,
            skipped: Vec::new(),
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn failed(source: RecordId, target: Option<RecordId>, detail: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Failed,
            source,
            target,
            attempted: 0,
            written: 0,
            skipped: Vec::new(),
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, SyncStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_webhook_envelope() {
        let payload = json!({
            "event": {
                "type": "update_column_value",
                "pulseId": 10974880446u64,
                "boardId": "100",
                "columnId": "status",
                "triggerTime": "2025-06-12T12:02:06.000Z",
            }
        });
        let notification = ChangeNotification::from_webhook_payload(&payload).unwrap();
        assert_eq!(notification.event_type, "update_column_value");
        assert_eq!(notification.record_id, RecordId(10_974_880_446));
        assert_eq!(notification.board_id, BoardId(100));
        assert_eq!(notification.column_id, Some(ColumnId::from("status")));
        assert!(notification.timestamp.is_some());
    }

    #[test]
    fn challenge_handshake_is_rejected() {
        let payload = json!({ "challenge": "abc123" });
        assert!(ChangeNotification::from_webhook_payload(&payload).is_err());
    }

    #[test]
    fn missing_record_id_is_rejected() {
        let payload = json!({ "event": { "type": "update_column_value", "boardId": 100 } });
        assert!(ChangeNotification::from_webhook_payload(&payload).is_err());
    }

    #[test]
    fn sync_result_serializes_with_flat_status() {
        let result = SyncResult::skipped(RecordId(1), SkipReason::NoMatch, "no admin record");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["reason"], "no_match");
        assert_eq!(value["source"], 1);
    }
}
