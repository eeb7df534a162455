//! Record helpers for SQLite tables with a JSON overflow column.
//!
//! Fields that match a declared column are stored in that column; every other
//! field is folded into one JSON object kept in the table's extension column
//! (`MashConfig` by default). Updates shallow-merge new overflow fields into
//! the stored object instead of replacing it.

pub mod blob;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod ops;
pub mod repo;
pub mod service;

pub use blob::{merge_blob, objectify, serialize_blob, split_fields, BlobError, SplitFields};
pub use config::{HaltConfig, DEFAULT_EXTENSION_COLUMN};
pub use db::{open_db, open_db_in_memory, DbError, DbTarget};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::record::{Filter, RawPredicate, Record, RowId};
pub use ops::{delete, insert, load_column, load_row, load_row_values, update};
pub use repo::table_repo::{HaltError, HaltResult, SqliteTableRepository, TableRepository};
pub use service::table_service::TableService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
