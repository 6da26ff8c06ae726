//! Field value model
//!
//! `RawColumn` is the wire snapshot of one field exactly as the remote
//! returns it; `ColumnValue` is the decoded, typed form the sync engine
//! works with. The shape of a value is keyed by the column's type tag,
//! so the variants here are handled exhaustively instead of inspecting
//! JSON at runtime.

use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Timelike;
use serde::Deserialize;
use serde::Serialize;

use super::column::ColumnId;
use super::column::ColumnType;

/// One field of a record as read from the remote store.
///
/// `value` is the remote's structured JSON document (null when the field
/// is empty); `text` is its human-readable rendering, which is the only
/// reliable carrier for status/dropdown labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    pub id: ColumnId,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl RawColumn {
    /// True when the remote holds no value for this field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let no_value = match &self.value {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        let no_text = self.text.as_deref().map_or(true, str::is_empty);
        no_value && no_text
    }
}

/// A calendar date with an optional time-of-day, timezone-naive.
///
/// Times are kept to minute precision; the remote reports seconds but
/// the sync contract only preserves down to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl DateValue {
    #[must_use]
    pub fn date_only(date: NaiveDate) -> Self {
        Self { date, time: None }
    }

    /// Attach a time-of-day, truncated to the minute.
    #[must_use]
    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        let truncated = time.with_second(0).and_then(|t| t.with_nanosecond(0));
        Self {
            date,
            time: truncated.or(Some(time)),
        }
    }
}

/// Decoded value of one field, keyed by the column's type family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValue {
    /// Field holds no value.
    Empty,
    /// Free text (`text`, `long_text`).
    Text(String),
    /// Numeric column.
    Number(f64),
    /// Selected option label of a `status`/`dropdown` column.
    Selection(String),
    /// `date` column.
    Date(DateValue),
    /// Person references of a `people` column, order preserved.
    People(Vec<u64>),
    /// `checkbox` column.
    Checkbox(bool),
    /// Structured payloads passed through unchanged (email, phone,
    /// link, location).
    Complex(serde_json::Value),
}

impl ColumnValue {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
