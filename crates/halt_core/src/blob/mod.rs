//! Extension blob: the JSON object column that absorbs undeclared fields.
//!
//! # Responsibility
//! - Split incoming records into declared-column values and overflow fields.
//! - Decode stored blobs (`objectify`) and encode them back.
//! - Shallow-merge overflow fields into an existing blob.
//!
//! # Invariants
//! - A blob is always a JSON object; other JSON shapes are rejected.
//! - Encoding never produces partial text: it either fully succeeds or errors.
//! - Merging is a shallow key union where incoming keys win.

use crate::db::schema::TableInfo;
use crate::model::record::Record;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug)]
pub enum BlobError {
    /// Stored text is not valid JSON.
    Json(serde_json::Error),
    /// Stored JSON is valid but not an object.
    NotAnObject(&'static str),
}

impl Display for BlobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "malformed extension blob: {err}"),
            Self::NotAnObject(kind) => {
                write!(f, "extension blob must be a JSON object, found {kind}")
            }
        }
    }
}

impl Error for BlobError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::NotAnObject(_) => None,
        }
    }
}

impl From<serde_json::Error> for BlobError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// A record partitioned against a table's declared columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitFields {
    /// Fields with a declared column, in record order.
    pub columns: Vec<(String, JsonValue)>,
    /// Fields without a declared column.
    pub extras: Record,
}

/// Decodes a stored extension blob.
///
/// `None`, empty or whitespace-only text and the JSON literal `null` all
/// decode to an empty map.
pub fn objectify(raw: Option<&str>) -> BlobResult<Record> {
    let text = match raw.map(str::trim) {
        None | Some("") => return Ok(Record::new()),
        Some(text) => text,
    };

    match serde_json::from_str::<JsonValue>(text)? {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(Record::new()),
        other => Err(BlobError::NotAnObject(json_kind(&other))),
    }
}

/// Encodes overflow fields as compact JSON object text.
pub fn serialize_blob(fields: &Record) -> BlobResult<String> {
    Ok(serde_json::to_string(fields)?)
}

/// Shallow-merges `updates` over `existing`.
///
/// Keys present in `updates` replace the existing value; every other
/// existing key is kept.
pub fn merge_blob(mut existing: Record, updates: &Record) -> Record {
    for (key, value) in updates {
        existing.insert(key.clone(), value.clone());
    }
    existing
}

/// Partitions `record` into declared-column values and overflow fields.
///
/// A field named like the extension column is treated as overflow, so the
/// blob column can only be written through the merge path.
pub fn split_fields(record: &Record, table: &TableInfo, extension_column: &str) -> SplitFields {
    let mut split = SplitFields::default();
    for (name, value) in record {
        if name != extension_column && table.has_column(name) {
            split.columns.push((name.clone(), value.clone()));
        } else {
            split.extras.insert(name.clone(), value.clone());
        }
    }
    split
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
