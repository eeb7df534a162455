//! Free-function entry points.
//!
//! Each call runs against a [`DbTarget`]: a path opens a connection for the
//! duration of the call, a borrowed connection is used as-is so the caller
//! keeps control of transactions.

use crate::config::HaltConfig;
use crate::db::{open_db, DbTarget};
use crate::model::record::{Filter, Record, RowId};
use crate::repo::table_repo::{HaltResult, SqliteTableRepository, TableRepository};
use rusqlite::Connection;
use serde_json::Value as JsonValue;

fn with_repo<'a, T, F>(target: impl Into<DbTarget<'a>>, config: &HaltConfig, body: F) -> HaltResult<T>
where
    F: FnOnce(&SqliteTableRepository<'_>) -> HaltResult<T>,
{
    match target.into() {
        DbTarget::Connection(conn) => body(&SqliteTableRepository::with_config(conn, config.clone())),
        DbTarget::Path(path) => {
            let conn: Connection = open_db(path)?;
            body(&SqliteTableRepository::with_config(&conn, config.clone()))
        }
    }
}

/// Inserts `record` into `table` and returns the new `rowid`.
pub fn insert<'a>(
    target: impl Into<DbTarget<'a>>,
    table: &str,
    record: &Record,
    config: &HaltConfig,
) -> HaltResult<RowId> {
    with_repo(target, config, |repo| repo.insert(table, record))
}

/// Updates rows of `table` matched by `filter`; returns the match count.
pub fn update<'a>(
    target: impl Into<DbTarget<'a>>,
    table: &str,
    record: &Record,
    filter: &Filter,
    config: &HaltConfig,
) -> HaltResult<usize> {
    with_repo(target, config, |repo| repo.update(table, record, filter))
}

/// Deletes rows of `table` matched by `filter`; returns the delete count.
pub fn delete<'a>(
    target: impl Into<DbTarget<'a>>,
    table: &str,
    filter: &Filter,
) -> HaltResult<usize> {
    with_repo(target, &HaltConfig::default(), |repo| repo.delete(table, filter))
}

/// Loads matched rows as records with the extension blob decoded.
pub fn load_row<'a>(
    target: impl Into<DbTarget<'a>>,
    table: &str,
    filter: &Filter,
    config: &HaltConfig,
) -> HaltResult<Vec<Record>> {
    with_repo(target, config, |repo| repo.load_row(table, filter))
}

/// Loads matched rows as positional tuples with the extension blob decoded.
pub fn load_row_values<'a>(
    target: impl Into<DbTarget<'a>>,
    table: &str,
    filter: &Filter,
    config: &HaltConfig,
) -> HaltResult<Vec<Vec<JsonValue>>> {
    with_repo(target, config, |repo| repo.load_row_values(table, filter))
}

/// Loads the requested columns of matched rows as plain tuples.
pub fn load_column<'a>(
    target: impl Into<DbTarget<'a>>,
    table: &str,
    columns: &[&str],
    filter: &Filter,
) -> HaltResult<Vec<Vec<JsonValue>>> {
    with_repo(target, &HaltConfig::default(), |repo| {
        repo.load_column(table, columns, filter)
    })
}
