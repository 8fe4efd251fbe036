//! Domain DTOs shared by the translators.
//!
//! Records are kept as JSON objects: the client never interprets resource
//! fields, it only moves them between the host and the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single resource record, field name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Identifier of a record. Backends use either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{id}"),
            RecordId::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Str(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// Normalized result of a CRUD action.
///
/// Serializes to `{"data": ...}` for single records and
/// `{"data": [...], "total": n}` for lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RestResult {
    One { data: Record },
    Many { data: Vec<Record>, total: u64 },
}

impl RestResult {
    pub fn into_record(self) -> Option<Record> {
        match self {
            RestResult::One { data } => Some(data),
            RestResult::Many { .. } => None,
        }
    }

    pub fn into_records(self) -> Option<(Vec<Record>, u64)> {
        match self {
            RestResult::Many { data, total } => Some((data, total)),
            RestResult::One { .. } => None,
        }
    }
}
