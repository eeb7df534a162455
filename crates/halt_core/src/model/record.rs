//! Record model and value conversion.
//!
//! # Responsibility
//! - Represent caller records as JSON maps keyed by field name.
//! - Map JSON scalars onto SQLite storage classes and back.
//! - Describe row selection with bound parameters only.
//!
//! # Invariants
//! - Filter values are never spliced into SQL text.
//! - Arrays/objects written to a declared column are stored as JSON text.

use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Number, Value as JsonValue};

/// Flat mapping from field name to value.
pub type Record = Map<String, JsonValue>;

/// SQLite `rowid` of a stored record.
pub type RowId = i64;

/// Converts a JSON value into the SQLite value bound for a declared column.
pub fn json_to_sql(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        JsonValue::Number(number) => match number.as_i64() {
            Some(integer) => SqlValue::Integer(integer),
            None => number.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        JsonValue::String(text) => SqlValue::Text(text.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Converts a stored SQLite value into its JSON form.
///
/// Non-finite reals become `null`; blobs become arrays of byte values.
pub fn sql_to_json(value: SqlValue) -> JsonValue {
    match value {
        SqlValue::Null => JsonValue::Null,
        SqlValue::Integer(integer) => JsonValue::from(integer),
        SqlValue::Real(real) => Number::from_f64(real).map_or(JsonValue::Null, JsonValue::Number),
        SqlValue::Text(text) => JsonValue::String(text),
        SqlValue::Blob(bytes) => JsonValue::Array(bytes.into_iter().map(JsonValue::from).collect()),
    }
}

/// Free-form SQL predicate with positional `?` parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPredicate {
    pub sql: String,
    pub params: Vec<JsonValue>,
}

/// Row selection for update/delete/load calls.
///
/// All parts are combined with `AND`. An empty filter selects every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Restrict to one `rowid`.
    pub row_id: Option<RowId>,
    /// `column IS value` conditions on declared columns.
    pub equals: Vec<(String, JsonValue)>,
    /// Optional caller-written predicate.
    pub raw: Option<RawPredicate>,
}

impl Filter {
    /// Selects every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Selects rows whose `column` equals `value`.
    pub fn eq(column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::default().and_eq(column, value)
    }

    /// Selects the row with the given `rowid`.
    pub fn row_id(row_id: RowId) -> Self {
        Self {
            row_id: Some(row_id),
            ..Self::default()
        }
    }

    /// Selects rows matching a raw SQL predicate.
    ///
    /// A leading `WHERE` keyword is accepted and stripped, so legacy
    /// conditions such as `"where Name == ?"` keep working.
    pub fn raw(sql: impl AsRef<str>, params: Vec<JsonValue>) -> Self {
        Self {
            raw: Some(RawPredicate {
                sql: strip_where_keyword(sql.as_ref()).to_string(),
                params,
            }),
            ..Self::default()
        }
    }

    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.equals.push((column.into(), value.into()));
        self
    }

    /// Returns whether this filter selects every row.
    pub fn is_empty(&self) -> bool {
        self.row_id.is_none()
            && self.equals.is_empty()
            && self.raw.as_ref().map_or(true, |raw| raw.sql.trim().is_empty())
    }
}

fn strip_where_keyword(sql: &str) -> &str {
    let trimmed = sql.trim();
    match trimmed.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("where") => {
            let rest = &trimmed[5..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    }
}
