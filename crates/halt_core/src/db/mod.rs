//! SQLite connection bootstrap and table metadata.
//!
//! # Responsibility
//! - Open and configure SQLite connections for halt operations.
//! - Describe which database a call should run against (`DbTarget`).
//! - Run multi-statement writes inside a savepoint.
//!
//! # Invariants
//! - Schema creation is the caller's job; nothing here issues DDL.
//! - Savepoints nest inside caller-owned transactions.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Database a free-function call runs against.
///
/// `Path` opens a fresh connection for the call and closes it afterwards.
/// `Connection` borrows the caller's connection; if the caller has an open
/// transaction the write only becomes durable once the caller commits.
#[derive(Clone, Copy)]
pub enum DbTarget<'a> {
    Path(&'a Path),
    Connection(&'a Connection),
}

impl<'a> From<&'a Path> for DbTarget<'a> {
    fn from(value: &'a Path) -> Self {
        Self::Path(value)
    }
}

impl<'a> From<&'a std::path::PathBuf> for DbTarget<'a> {
    fn from(value: &'a std::path::PathBuf) -> Self {
        Self::Path(value.as_path())
    }
}

impl<'a> From<&'a Connection> for DbTarget<'a> {
    fn from(value: &'a Connection) -> Self {
        Self::Connection(value)
    }
}

/// Runs `body` inside a named savepoint on `conn`.
///
/// The savepoint is released when `body` succeeds and rolled back when it
/// returns an error. Works both in autocommit mode and inside an outer
/// transaction owned by the caller.
pub fn with_savepoint<T, E, F>(conn: &Connection, name: &str, body: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    let quoted = schema::quote_identifier(name);
    conn.execute_batch(&format!("SAVEPOINT {quoted};"))?;

    match body(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE SAVEPOINT {quoted};"))?;
            Ok(value)
        }
        Err(err) => {
            // Rollback failure is secondary to the original error.
            let _ = conn.execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {quoted}; RELEASE SAVEPOINT {quoted};"
            ));
            Err(err)
        }
    }
}
