//! Generic table repository with extension-blob support.
//!
//! # Responsibility
//! - Provide insert/update/delete/load APIs over any declared SQLite table.
//! - Route undeclared fields into the extension column.
//! - Normalize stored rows back into records with the blob decoded.
//!
//! # Invariants
//! - Table and column names are validated against declared metadata before
//!   any SQL is built; values are always bound parameters.
//! - `update` resolves matched rows by `rowid` before writing anything and
//!   runs inside one savepoint.
//! - The extension column only ever receives text from `serialize_blob`.

use crate::blob::{merge_blob, objectify, serialize_blob, split_fields, BlobError};
use crate::config::HaltConfig;
use crate::db::schema::{is_valid_identifier, load_table_info, quote_identifier, TableInfo};
use crate::db::{with_savepoint, DbError};
use crate::model::record::{json_to_sql, sql_to_json, Filter, Record, RowId};
use log::{debug, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const UPDATE_SAVEPOINT: &str = "halt_update";

pub type HaltResult<T> = Result<T, HaltError>;

/// Error for every record operation.
#[derive(Debug)]
pub enum HaltError {
    Db(DbError),
    Blob(BlobError),
    /// Table name is not a plain identifier.
    InvalidIdentifier(String),
    /// Table has no declared columns (does not exist).
    UnknownTable(String),
    UnknownColumn {
        table: String,
        column: String,
    },
    /// Overflow fields were supplied but the table lacks the blob column.
    MissingExtensionColumn {
        table: String,
        column: String,
    },
    /// Stored extension value is unreadable for the given row.
    InvalidBlob {
        row_id: Option<RowId>,
        message: String,
    },
    InvalidInput(String),
}

impl Display for HaltError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Blob(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid SQL identifier `{name}`"),
            Self::UnknownTable(table) => write!(f, "table not found: {table}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "column `{column}` is not declared on table `{table}`")
            }
            Self::MissingExtensionColumn { table, column } => write!(
                f,
                "table `{table}` has no extension column `{column}` for undeclared fields"
            ),
            Self::InvalidBlob { row_id, message } => match row_id {
                Some(row_id) => write!(f, "invalid extension blob in row {row_id}: {message}"),
                None => write!(f, "invalid extension blob: {message}"),
            },
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl Error for HaltError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Blob(err) => Some(err),
            Self::InvalidIdentifier(_)
            | Self::UnknownTable(_)
            | Self::UnknownColumn { .. }
            | Self::MissingExtensionColumn { .. }
            | Self::InvalidBlob { .. }
            | Self::InvalidInput(_) => None,
        }
    }
}

impl From<DbError> for HaltError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for HaltError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<BlobError> for HaltError {
    fn from(value: BlobError) -> Self {
        Self::Blob(value)
    }
}

/// Repository interface for record operations on arbitrary tables.
pub trait TableRepository {
    /// Inserts one record and returns its `rowid`.
    fn insert(&self, table: &str, record: &Record) -> HaltResult<RowId>;
    /// Updates matched rows, merging overflow fields into their blobs.
    /// Returns the number of matched rows.
    fn update(&self, table: &str, record: &Record, filter: &Filter) -> HaltResult<usize>;
    /// Deletes matched rows and returns how many were removed.
    fn delete(&self, table: &str, filter: &Filter) -> HaltResult<usize>;
    /// Loads matched rows as records with the blob decoded into an object.
    fn load_row(&self, table: &str, filter: &Filter) -> HaltResult<Vec<Record>>;
    /// Loads matched rows as tuples in declaration order, blob decoded.
    fn load_row_values(&self, table: &str, filter: &Filter) -> HaltResult<Vec<Vec<JsonValue>>>;
    /// Loads only `columns` of matched rows as plain tuples.
    fn load_column(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Filter,
    ) -> HaltResult<Vec<Vec<JsonValue>>>;
}

/// SQLite-backed table repository.
pub struct SqliteTableRepository<'conn> {
    conn: &'conn Connection,
    config: HaltConfig,
}

impl<'conn> SqliteTableRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_config(conn, HaltConfig::default())
    }

    pub fn with_config(conn: &'conn Connection, config: HaltConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &HaltConfig {
        &self.config
    }

    fn resolve_table(&self, table: &str) -> HaltResult<TableInfo> {
        if !is_valid_identifier(table) {
            return Err(HaltError::InvalidIdentifier(table.to_string()));
        }
        load_table_info(self.conn, table)?.ok_or_else(|| HaltError::UnknownTable(table.to_string()))
    }

    fn ensure_extension_column(&self, info: &TableInfo) -> HaltResult<()> {
        if info.has_column(&self.config.extension_column) {
            return Ok(());
        }
        Err(HaltError::MissingExtensionColumn {
            table: info.name.clone(),
            column: self.config.extension_column.clone(),
        })
    }

    /// Returns whether overflow fields should be written to the blob.
    fn accepts_extras(&self, info: &TableInfo, extras: &Record) -> HaltResult<bool> {
        if extras.is_empty() {
            return Ok(false);
        }
        if !self.config.mash {
            debug!(
                "event=record_extras_dropped module=repo table={} dropped={}",
                info.name,
                extras.len()
            );
            return Ok(false);
        }
        self.ensure_extension_column(info)?;
        Ok(true)
    }

    fn select_rows(
        &self,
        info: &TableInfo,
        filter: &Filter,
    ) -> HaltResult<Vec<(RowId, Vec<SqlValue>)>> {
        let (where_sql, bind_values) = render_filter(info, filter)?;
        let column_list = info
            .columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT rowid, {column_list} FROM {}{where_sql} ORDER BY rowid;",
            quote_identifier(&info.name)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut loaded = Vec::new();
        while let Some(row) = rows.next()? {
            let row_id: RowId = row.get(0)?;
            loaded.push((row_id, read_values(row, 1, info.columns.len())?));
        }
        Ok(loaded)
    }

    /// Converts one stored row into JSON values, decoding the blob column.
    fn decode_row(
        &self,
        info: &TableInfo,
        row_id: RowId,
        values: Vec<SqlValue>,
    ) -> HaltResult<Vec<JsonValue>> {
        let blob_index = info.column_index(&self.config.extension_column);
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| -> HaltResult<JsonValue> {
                if Some(index) == blob_index {
                    let blob = decode_stored_blob(value, Some(row_id))?;
                    Ok(JsonValue::Object(blob))
                } else {
                    Ok(sql_to_json(value))
                }
            })
            .collect()
    }
}

impl TableRepository for SqliteTableRepository<'_> {
    fn insert(&self, table: &str, record: &Record) -> HaltResult<RowId> {
        let started_at = Instant::now();
        let info = self.resolve_table(table)?;
        let split = split_fields(record, &info, &self.config.extension_column);

        let mut columns = Vec::with_capacity(split.columns.len() + 1);
        let mut bind_values = Vec::with_capacity(split.columns.len() + 1);
        for (name, value) in &split.columns {
            columns.push(quote_identifier(name));
            bind_values.push(json_to_sql(value));
        }
        if self.accepts_extras(&info, &split.extras)? {
            columns.push(quote_identifier(&self.config.extension_column));
            bind_values.push(SqlValue::Text(serialize_blob(&split.extras)?));
        }

        let table_sql = quote_identifier(&info.name);
        let sql = if columns.is_empty() {
            format!("INSERT INTO {table_sql} DEFAULT VALUES;")
        } else {
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {table_sql} ({}) VALUES ({placeholders});",
                columns.join(", ")
            )
        };

        if let Err(err) = self.conn.execute(&sql, params_from_iter(bind_values)) {
            warn!(
                "event=record_insert module=repo status=error table={} duration_ms={} error={}",
                info.name,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }

        let row_id = self.conn.last_insert_rowid();
        debug!(
            "event=record_insert module=repo status=ok table={} row_id={} columns={} extras={} duration_ms={}",
            info.name,
            row_id,
            split.columns.len(),
            split.extras.len(),
            started_at.elapsed().as_millis()
        );
        Ok(row_id)
    }

    fn update(&self, table: &str, record: &Record, filter: &Filter) -> HaltResult<usize> {
        let started_at = Instant::now();
        let info = self.resolve_table(table)?;
        let split = split_fields(record, &info, &self.config.extension_column);
        let write_blob = self.accepts_extras(&info, &split.extras)?;
        let (where_sql, where_values) = render_filter(&info, filter)?;
        let table_sql = quote_identifier(&info.name);

        let result = with_savepoint(self.conn, UPDATE_SAVEPOINT, |conn| -> HaltResult<usize> {
            let mut select_ids = conn.prepare(&format!(
                "SELECT rowid FROM {table_sql}{where_sql} ORDER BY rowid;"
            ))?;
            let row_ids = select_ids
                .query_map(params_from_iter(where_values), |row| row.get::<_, RowId>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            if row_ids.is_empty() {
                return Ok(0);
            }

            if !split.columns.is_empty() {
                let assignments = split
                    .columns
                    .iter()
                    .map(|(name, _)| format!("{} = ?", quote_identifier(name)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut write_columns = conn.prepare(&format!(
                    "UPDATE {table_sql} SET {assignments} WHERE rowid = ?;"
                ))?;
                for row_id in &row_ids {
                    let mut bind_values = split
                        .columns
                        .iter()
                        .map(|(_, value)| json_to_sql(value))
                        .collect::<Vec<_>>();
                    bind_values.push(SqlValue::Integer(*row_id));
                    write_columns.execute(params_from_iter(bind_values))?;
                }
            }

            if write_blob {
                let blob_sql = quote_identifier(&self.config.extension_column);
                let mut read_blob =
                    conn.prepare(&format!("SELECT {blob_sql} FROM {table_sql} WHERE rowid = ?1;"))?;
                let mut write_blob_stmt = conn.prepare(&format!(
                    "UPDATE {table_sql} SET {blob_sql} = ?1 WHERE rowid = ?2;"
                ))?;
                for row_id in &row_ids {
                    let stored: SqlValue = read_blob.query_row([row_id], |row| row.get(0))?;
                    let existing = decode_stored_blob(stored, Some(*row_id))?;
                    let merged = merge_blob(existing, &split.extras);
                    write_blob_stmt.execute(params![serialize_blob(&merged)?, row_id])?;
                }
            }

            Ok(row_ids.len())
        });

        match &result {
            Ok(matched) => debug!(
                "event=record_update module=repo status=ok table={} matched={} columns={} extras={} duration_ms={}",
                info.name,
                matched,
                split.columns.len(),
                if write_blob { split.extras.len() } else { 0 },
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=record_update module=repo status=error table={} duration_ms={} error={}",
                info.name,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn delete(&self, table: &str, filter: &Filter) -> HaltResult<usize> {
        let started_at = Instant::now();
        let info = self.resolve_table(table)?;
        let (where_sql, bind_values) = render_filter(&info, filter)?;

        let deleted = self.conn.execute(
            &format!("DELETE FROM {}{where_sql};", quote_identifier(&info.name)),
            params_from_iter(bind_values),
        )?;

        debug!(
            "event=record_delete module=repo status=ok table={} deleted={} duration_ms={}",
            info.name,
            deleted,
            started_at.elapsed().as_millis()
        );
        Ok(deleted)
    }

    fn load_row(&self, table: &str, filter: &Filter) -> HaltResult<Vec<Record>> {
        let info = self.resolve_table(table)?;
        let mut records = Vec::new();
        for (row_id, values) in self.select_rows(&info, filter)? {
            let decoded = self.decode_row(&info, row_id, values)?;
            records.push(info.columns.iter().cloned().zip(decoded).collect::<Record>());
        }
        Ok(records)
    }

    fn load_row_values(&self, table: &str, filter: &Filter) -> HaltResult<Vec<Vec<JsonValue>>> {
        let info = self.resolve_table(table)?;
        self.select_rows(&info, filter)?
            .into_iter()
            .map(|(row_id, values)| self.decode_row(&info, row_id, values))
            .collect()
    }

    fn load_column(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Filter,
    ) -> HaltResult<Vec<Vec<JsonValue>>> {
        let info = self.resolve_table(table)?;
        if columns.is_empty() {
            return Err(HaltError::InvalidInput(
                "load_column needs at least one column".to_string(),
            ));
        }
        for column in columns {
            ensure_declared(&info, column)?;
        }

        let (where_sql, bind_values) = render_filter(&info, filter)?;
        let column_list = columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column_list} FROM {}{where_sql} ORDER BY rowid;",
            quote_identifier(&info.name)
        ))?;

        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tuples = Vec::new();
        while let Some(row) = rows.next()? {
            let values = read_values(row, 0, columns.len())?;
            tuples.push(values.into_iter().map(sql_to_json).collect());
        }
        Ok(tuples)
    }
}

fn ensure_declared(info: &TableInfo, column: &str) -> HaltResult<()> {
    if info.has_column(column) {
        return Ok(());
    }
    Err(HaltError::UnknownColumn {
        table: info.name.clone(),
        column: column.to_string(),
    })
}

/// Builds the ` WHERE ...` suffix and its bind values.
///
/// Returns an empty suffix when the filter selects every row.
fn render_filter(info: &TableInfo, filter: &Filter) -> HaltResult<(String, Vec<SqlValue>)> {
    let mut conditions = Vec::new();
    let mut bind_values = Vec::new();

    if let Some(row_id) = filter.row_id {
        conditions.push("rowid = ?".to_string());
        bind_values.push(SqlValue::Integer(row_id));
    }

    for (column, value) in &filter.equals {
        ensure_declared(info, column)?;
        conditions.push(format!("{} IS ?", quote_identifier(column)));
        bind_values.push(json_to_sql(value));
    }

    if let Some(raw) = filter.raw.as_ref() {
        if !raw.sql.trim().is_empty() {
            conditions.push(format!("({})", raw.sql));
            bind_values.extend(raw.params.iter().map(json_to_sql));
        }
    }

    if conditions.is_empty() {
        return Ok((String::new(), bind_values));
    }
    Ok((format!(" WHERE {}", conditions.join(" AND ")), bind_values))
}

fn read_values(row: &Row<'_>, offset: usize, count: usize) -> rusqlite::Result<Vec<SqlValue>> {
    (offset..offset + count).map(|index| row.get(index)).collect()
}

fn decode_stored_blob(value: SqlValue, row_id: Option<RowId>) -> HaltResult<Record> {
    let decoded = match value {
        SqlValue::Null => objectify(None),
        SqlValue::Text(text) => objectify(Some(text.as_str())),
        SqlValue::Integer(_) | SqlValue::Real(_) | SqlValue::Blob(_) => {
            return Err(HaltError::InvalidBlob {
                row_id,
                message: "stored value is not text".to_string(),
            });
        }
    };
    decoded.map_err(|err| HaltError::InvalidBlob {
        row_id,
        message: err.to_string(),
    })
}
