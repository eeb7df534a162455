//! Table metadata lookup and identifier handling.
//!
//! # Invariants
//! - Column order follows the table declaration (`cid` order).
//! - Identifiers reaching generated SQL are always double-quoted.

use super::DbResult;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Declared shape of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    /// Declared column names in declaration order.
    pub columns: Vec<String>,
}

impl TableInfo {
    /// Returns whether `column` is declared on this table (exact match).
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|declared| declared == column)
    }

    /// Returns the declaration index of `column`.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|declared| declared == column)
    }
}

/// Returns whether `name` is a plain SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Wraps `name` in double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Loads declared columns for `table`.
///
/// Returns `Ok(None)` when the table does not exist.
pub fn load_table_info(conn: &Connection, table: &str) -> DbResult<Option<TableInfo>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid;")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Ok(None);
    }

    Ok(Some(TableInfo {
        name: table.to_string(),
        columns,
    }))
}
