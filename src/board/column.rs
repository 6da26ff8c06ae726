//! Column definitions and board schemas

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identifier of a board on the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub u64);

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a record (item/pulse) on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a column. Remote column ids are opaque strings like
/// `text_mkrctj55` or `status`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Column type tag as reported by the remote store.
///
/// The read-only family (`mirror`, `formula`, audit columns) can never be
/// written; tags this crate has no codec for deserialize as `Unknown` and
/// are rejected at transcode time rather than at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    LongText,
    Numbers,
    Status,
    Dropdown,
    Date,
    People,
    Checkbox,
    Email,
    Phone,
    Link,
    Location,
    File,
    Mirror,
    Formula,
    ItemId,
    Subtasks,
    Dependency,
    AutoNumber,
    CreationLog,
    LastUpdated,
    #[serde(other)]
    Unknown,
}

impl ColumnType {
    /// True for column types the remote store never accepts writes for.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::Mirror
                | Self::Formula
                | Self::ItemId
                | Self::Subtasks
                | Self::Dependency
                | Self::AutoNumber
                | Self::CreationLog
                | Self::LastUpdated
        )
    }

    /// Wire tag for this type, matching the remote's `snake_case` names.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::LongText => "long_text",
            Self::Numbers => "numbers",
            Self::Status => "status",
            Self::Dropdown => "dropdown",
            Self::Date => "date",
            Self::People => "people",
            Self::Checkbox => "checkbox",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Link => "link",
            Self::Location => "location",
            Self::File => "file",
            Self::Mirror => "mirror",
            Self::Formula => "formula",
            Self::ItemId => "item_id",
            Self::Subtasks => "subtasks",
            Self::Dependency => "dependency",
            Self::AutoNumber => "auto_number",
            Self::CreationLog => "creation_log",
            Self::LastUpdated => "last_updated",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One column of a board schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub title: String,
    pub column_type: ColumnType,
    /// Enumerated option labels for `status`/`dropdown` columns, in the
    /// remote's declared order. Empty for every other type.
    #[serde(default)]
    pub options: Vec<String>,
}

impl ColumnDef {
    pub fn new(id: impl Into<ColumnId>, title: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            column_type,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Whether `label` is one of this column's enumerated options.
    #[must_use]
    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| o == label)
    }
}

/// Full column schema of one board, in the remote's native column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSchema {
    pub board: BoardId,
    pub columns: Vec<ColumnDef>,
}

impl BoardSchema {
    #[must_use]
    pub fn new(board: BoardId, columns: Vec<ColumnDef>) -> Self {
        Self { board, columns }
    }

    #[must_use]
    pub fn column(&self, id: &ColumnId) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| &c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_parses_remote_tags() {
        let ty: ColumnType = serde_json::from_str("\"long_text\"").unwrap();
        assert_eq!(ty, ColumnType::LongText);
        let ty: ColumnType = serde_json::from_str("\"auto_number\"").unwrap();
        assert_eq!(ty, ColumnType::AutoNumber);
    }

    #[test]
    fn unrecognized_tag_falls_back_to_unknown() {
        let ty: ColumnType = serde_json::from_str("\"color_picker\"").unwrap();
        assert_eq!(ty, ColumnType::Unknown);
        assert!(!ty.is_read_only());
    }

    #[test]
    fn read_only_family() {
        assert!(ColumnType::Mirror.is_read_only());
        assert!(ColumnType::Formula.is_read_only());
        assert!(ColumnType::CreationLog.is_read_only());
        assert!(!ColumnType::Status.is_read_only());
        assert!(!ColumnType::Text.is_read_only());
    }

    #[test]
    fn schema_lookup_by_id() {
        let schema = BoardSchema::new(
            BoardId(1),
            vec![
                ColumnDef::new("status", "Status", ColumnType::Status),
                ColumnDef::new("text_abc", "Notes", ColumnType::Text),
            ],
        );
        assert!(schema.column(&ColumnId::from("text_abc")).is_some());
        assert!(schema.column(&ColumnId::from("missing")).is_none());
    }
}
