//! Table-scoped record service.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - Service layer remains storage-agnostic.

use crate::model::record::{Filter, Record, RowId};
use crate::repo::table_repo::{HaltResult, TableRepository};
use serde_json::Value as JsonValue;

/// Record operations bound to a single table.
pub struct TableService<R: TableRepository> {
    repo: R,
    table: String,
}

impl<R: TableRepository> TableService<R> {
    pub fn new(repo: R, table: impl Into<String>) -> Self {
        Self {
            repo,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn insert(&self, record: &Record) -> HaltResult<RowId> {
        self.repo.insert(&self.table, record)
    }

    pub fn update(&self, record: &Record, filter: &Filter) -> HaltResult<usize> {
        self.repo.update(&self.table, record, filter)
    }

    /// Updates the single row created by a previous `insert`.
    pub fn update_by_id(&self, row_id: RowId, record: &Record) -> HaltResult<usize> {
        self.repo.update(&self.table, record, &Filter::row_id(row_id))
    }

    pub fn delete(&self, filter: &Filter) -> HaltResult<usize> {
        self.repo.delete(&self.table, filter)
    }

    /// Loads one row by id, or `None` when it no longer exists.
    pub fn get(&self, row_id: RowId) -> HaltResult<Option<Record>> {
        Ok(self
            .repo
            .load_row(&self.table, &Filter::row_id(row_id))?
            .into_iter()
            .next())
    }

    pub fn load_row(&self, filter: &Filter) -> HaltResult<Vec<Record>> {
        self.repo.load_row(&self.table, filter)
    }

    pub fn load_row_values(&self, filter: &Filter) -> HaltResult<Vec<Vec<JsonValue>>> {
        self.repo.load_row_values(&self.table, filter)
    }

    pub fn load_column(&self, columns: &[&str], filter: &Filter) -> HaltResult<Vec<Vec<JsonValue>>> {
        self.repo.load_column(&self.table, columns, filter)
    }
}
