//! Type-aware column value transcoding
//!
//! [`decode`] turns a raw field snapshot into a typed [`ColumnValue`];
//! [`encode`] turns a typed value into the wire form the remote's
//! multi-column mutation accepts, validated against the *target*
//! column's definition. Both reject read-only and unknown type tags
//! loudly even though the planner never schedules them.

use chrono::NaiveDate;
use chrono::NaiveTime;
use serde_json::json;
use serde_json::Value;
use thiserror::Error;

use crate::board::ColumnDef;
use crate::board::ColumnId;
use crate::board::ColumnType;
use crate::board::ColumnValue;
use crate::board::DateValue;
use crate::board::RawColumn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The selected option label does not exist on the target column.
    #[error("column {column}: option {label:?} does not exist on the target column")]
    OptionMismatch { column: ColumnId, label: String },

    /// No codec exists for this column type.
    #[error("column type {tag} is not supported for transcoding")]
    UnsupportedType { tag: ColumnType },

    /// Computed column types can never be transcoded.
    #[error("column type {tag} is read-only and can never be written")]
    ReadOnlyType { tag: ColumnType },

    /// The remote returned a value whose shape does not match its
    /// declared type.
    #[error("column {column}: malformed value: {detail}")]
    Malformed { column: ColumnId, detail: String },
}

/// Decode one raw field snapshot into its typed value.
pub fn decode(raw: &RawColumn) -> Result<ColumnValue, CodecError> {
    if raw.column_type.is_read_only() {
        return Err(CodecError::ReadOnlyType {
            tag: raw.column_type,
        });
    }
    if matches!(raw.column_type, ColumnType::Unknown | ColumnType::File) {
        return Err(CodecError::UnsupportedType {
            tag: raw.column_type,
        });
    }
    if raw.is_empty() {
        return Ok(ColumnValue::Empty);
    }

    let malformed = |detail: &str| CodecError::Malformed {
        column: raw.id.clone(),
        detail: detail.to_string(),
    };

    match raw.column_type {
        ColumnType::Text | ColumnType::LongText => {
            let text = raw
                .text
                .clone()
                .or_else(|| raw.value.as_ref().and_then(value_as_string))
                .ok_or_else(|| malformed("text column without text"))?;
            Ok(ColumnValue::Text(text))
        }
        ColumnType::Numbers => {
            let rendered = raw
                .text
                .clone()
                .or_else(|| raw.value.as_ref().and_then(value_as_string))
                .ok_or_else(|| malformed("numeric column without a rendering"))?;
            rendered
                .trim()
                .parse::<f64>()
                .map(ColumnValue::Number)
                .map_err(|_| malformed(&format!("unparseable number {rendered:?}")))
        }
        ColumnType::Status | ColumnType::Dropdown => {
            // The structured value only carries the option index; the
            // label lives in the text rendering.
            let label = raw
                .text
                .clone()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| malformed("selection without a label"))?;
            Ok(ColumnValue::Selection(label))
        }
        ColumnType::Date => decode_date(raw).map(ColumnValue::Date),
        ColumnType::People => {
            let entries = raw
                .value
                .as_ref()
                .and_then(|v| v.get("personsAndTeams"))
                .and_then(Value::as_array)
                .ok_or_else(|| malformed("people column without personsAndTeams"))?;
            let mut ids = Vec::with_capacity(entries.len());
            for entry in entries {
                let id = entry
                    .get("id")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| malformed("person entry without numeric id"))?;
                ids.push(id);
            }
            Ok(ColumnValue::People(ids))
        }
        ColumnType::Checkbox => {
            let checked = raw
                .value
                .as_ref()
                .and_then(|v| v.get("checked"))
                .map(|c| c == "true" || c == &Value::Bool(true))
                .unwrap_or(false);
            Ok(ColumnValue::Checkbox(checked))
        }
        ColumnType::Email | ColumnType::Phone | ColumnType::Link | ColumnType::Location => {
            let value = raw
                .value
                .clone()
                .ok_or_else(|| malformed("structured column without a value"))?;
            Ok(ColumnValue::Complex(value))
        }
        // Read-only, File and Unknown are rejected above.
        _ => Err(CodecError::UnsupportedType {
            tag: raw.column_type,
        }),
    }
}

/// Encode a typed value for a write to the given target column.
///
/// The remote has no non-empty wire form for an unchecked checkbox, so
/// `Checkbox(false)` encodes as the clear sentinel and reads back as
/// empty rather than as an explicit `false`.
pub fn encode(target: &ColumnDef, value: &ColumnValue) -> Result<Value, CodecError> {
    if target.column_type.is_read_only() {
        return Err(CodecError::ReadOnlyType {
            tag: target.column_type,
        });
    }
    if matches!(target.column_type, ColumnType::Unknown | ColumnType::File) {
        return Err(CodecError::UnsupportedType {
            tag: target.column_type,
        });
    }
    if value.is_empty() {
        // Writing "" is the remote's clear operation for every type.
        return Ok(Value::String(String::new()));
    }

    let mismatch = |detail: String| CodecError::Malformed {
        column: target.id.clone(),
        detail,
    };

    match (target.column_type, value) {
        (ColumnType::Text | ColumnType::LongText, ColumnValue::Text(text)) => {
            Ok(Value::String(text.clone()))
        }
        (ColumnType::Numbers, ColumnValue::Number(n)) => Ok(Value::String(format_number(*n))),
        (ColumnType::Status, ColumnValue::Selection(label)) => {
            if !target.has_option(label) {
                return Err(CodecError::OptionMismatch {
                    column: target.id.clone(),
                    label: label.clone(),
                });
            }
            Ok(json!({ "label": label }))
        }
        (ColumnType::Dropdown, ColumnValue::Selection(label)) => {
            if !target.has_option(label) {
                return Err(CodecError::OptionMismatch {
                    column: target.id.clone(),
                    label: label.clone(),
                });
            }
            Ok(json!({ "labels": [label] }))
        }
        (ColumnType::Date, ColumnValue::Date(date)) => Ok(encode_date(*date)),
        (ColumnType::People, ColumnValue::People(ids)) => {
            let entries: Vec<Value> = ids
                .iter()
                .map(|id| json!({ "id": id, "kind": "person" }))
                .collect();
            Ok(json!({ "personsAndTeams": entries }))
        }
        (ColumnType::Checkbox, ColumnValue::Checkbox(true)) => Ok(json!({ "checked": "true" })),
        (ColumnType::Checkbox, ColumnValue::Checkbox(false)) => Ok(Value::String(String::new())),
        (
            ColumnType::Email | ColumnType::Phone | ColumnType::Link | ColumnType::Location,
            ColumnValue::Complex(payload),
        ) => Ok(payload.clone()),
        (column_type, other) => Err(mismatch(format!(
            "value {other:?} does not fit column type {column_type}"
        ))),
    }
}

fn decode_date(raw: &RawColumn) -> Result<DateValue, CodecError> {
    let malformed = |detail: String| CodecError::Malformed {
        column: raw.id.clone(),
        detail,
    };

    let value = raw
        .value
        .as_ref()
        .ok_or_else(|| malformed("date column without a value".to_string()))?;
    let date_str = value
        .get("date")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| malformed("date value without a date field".to_string()))?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| malformed(format!("unparseable date {date_str:?}: {e}")))?;

    match value.get("time").and_then(Value::as_str).filter(|t| !t.is_empty()) {
        Some(time_str) => {
            let time = NaiveTime::parse_from_str(time_str, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(time_str, "%H:%M"))
                .map_err(|e| malformed(format!("unparseable time {time_str:?}: {e}")))?;
            Ok(DateValue::at(date, time))
        }
        None => Ok(DateValue::date_only(date)),
    }
}

fn encode_date(value: DateValue) -> Value {
    match value.time {
        Some(time) => json!({
            "date": value.date.format("%Y-%m-%d").to_string(),
            "time": time.format("%H:%M:%S").to_string(),
        }),
        None => json!({ "date": value.date.format("%Y-%m-%d").to_string() }),
    }
}

/// Render a number the way the remote's numeric columns expect: integral
/// values without a trailing fraction.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, column_type: ColumnType, text: Option<&str>, value: Option<Value>) -> RawColumn {
        RawColumn {
            id: ColumnId::from(id),
            column_type,
            text: text.map(ToString::to_string),
            value,
        }
    }

    #[test]
    fn text_round_trip() {
        let source = raw("text_a", ColumnType::Text, Some("Task X"), None);
        let decoded = decode(&source).unwrap();
        assert_eq!(decoded, ColumnValue::Text("Task X".into()));

        let target = ColumnDef::new("text_b", "Name", ColumnType::Text);
        assert_eq!(encode(&target, &decoded).unwrap(), json!("Task X"));
    }

    #[test]
    fn status_label_travels_via_text() {
        let source = raw(
            "status",
            ColumnType::Status,
            Some("Done"),
            Some(json!({"index": 1})),
        );
        assert_eq!(decode(&source).unwrap(), ColumnValue::Selection("Done".into()));
    }

    #[test]
    fn status_encode_validates_target_options() {
        let target = ColumnDef::new("status", "Status", ColumnType::Status)
            .with_options(vec!["Working on it".into(), "Done".into()]);

        assert_eq!(
            encode(&target, &ColumnValue::Selection("Done".into())).unwrap(),
            json!({"label": "Done"})
        );

        let err = encode(&target, &ColumnValue::Selection("Archived".into())).unwrap_err();
        assert!(matches!(err, CodecError::OptionMismatch { ref label, .. } if label == "Archived"));
    }

    #[test]
    fn dropdown_encodes_labels_array() {
        let target = ColumnDef::new("dropdown", "Tags", ColumnType::Dropdown)
            .with_options(vec!["Red".into(), "Blue".into()]);
        assert_eq!(
            encode(&target, &ColumnValue::Selection("Blue".into())).unwrap(),
            json!({"labels": ["Blue"]})
        );
    }

    #[test]
    fn date_with_time_keeps_minute_precision() {
        let source = raw(
            "date",
            ColumnType::Date,
            Some("2025-06-12 14:30"),
            Some(json!({"date": "2025-06-12", "time": "14:30:27"})),
        );
        let decoded = decode(&source).unwrap();
        let ColumnValue::Date(date) = decoded else {
            panic!("expected a date value");
        };
        assert_eq!(date.time, NaiveTime::from_hms_opt(14, 30, 0));

        let target = ColumnDef::new("date", "Due", ColumnType::Date);
        assert_eq!(
            encode(&target, &ColumnValue::Date(date)).unwrap(),
            json!({"date": "2025-06-12", "time": "14:30:00"})
        );
    }

    #[test]
    fn timezone_naive_date_passes_through() {
        let source = raw(
            "date",
            ColumnType::Date,
            Some("2025-06-12"),
            Some(json!({"date": "2025-06-12"})),
        );
        let decoded = decode(&source).unwrap();
        let target = ColumnDef::new("date", "Due", ColumnType::Date);
        assert_eq!(
            encode(&target, &decoded).unwrap(),
            json!({"date": "2025-06-12"})
        );
    }

    #[test]
    fn people_order_is_preserved() {
        let source = raw(
            "people",
            ColumnType::People,
            Some("Alice, Bob"),
            Some(json!({"personsAndTeams": [{"id": 42, "kind": "person"}, {"id": 7, "kind": "person"}]})),
        );
        let decoded = decode(&source).unwrap();
        assert_eq!(decoded, ColumnValue::People(vec![42, 7]));

        let target = ColumnDef::new("people", "Owner", ColumnType::People);
        assert_eq!(
            encode(&target, &decoded).unwrap(),
            json!({"personsAndTeams": [{"id": 42, "kind": "person"}, {"id": 7, "kind": "person"}]})
        );
    }

    #[test]
    fn read_only_types_fail_loudly() {
        let source = raw("mirror", ColumnType::Mirror, Some("computed"), None);
        assert!(matches!(
            decode(&source),
            Err(CodecError::ReadOnlyType { tag: ColumnType::Mirror })
        ));

        let target = ColumnDef::new("formula", "F", ColumnType::Formula);
        assert!(matches!(
            encode(&target, &ColumnValue::Text("x".into())),
            Err(CodecError::ReadOnlyType { tag: ColumnType::Formula })
        ));
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let source = raw("weird", ColumnType::Unknown, Some("?"), None);
        assert!(matches!(
            decode(&source),
            Err(CodecError::UnsupportedType { tag: ColumnType::Unknown })
        ));
    }

    #[test]
    fn empty_decodes_to_empty_and_encodes_to_clear() {
        let source = raw("text_a", ColumnType::Text, None, None);
        assert_eq!(decode(&source).unwrap(), ColumnValue::Empty);

        let target = ColumnDef::new("text_a", "Name", ColumnType::Text);
        assert_eq!(encode(&target, &ColumnValue::Empty).unwrap(), json!(""));
    }

    #[test]
    fn numbers_render_without_trailing_fraction() {
        let source = raw("numbers", ColumnType::Numbers, Some("12"), Some(json!("12")));
        let decoded = decode(&source).unwrap();
        let target = ColumnDef::new("numbers", "Amount", ColumnType::Numbers);
        assert_eq!(encode(&target, &decoded).unwrap(), json!("12"));

        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn shape_mismatch_is_malformed() {
        let target = ColumnDef::new("date", "Due", ColumnType::Date);
        assert!(matches!(
            encode(&target, &ColumnValue::Text("tomorrow".into())),
            Err(CodecError::Malformed { .. })
        ));
    }
}
