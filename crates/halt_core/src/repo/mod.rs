//! Repository layer over arbitrary SQLite tables.
//!
//! # Responsibility
//! - Own all SQL generation for record reads and writes.
//! - Keep extension-blob handling behind a small trait.
//!
//! # Invariants
//! - Repository APIs never build SQL from unvalidated identifiers.

pub mod table_repo;
