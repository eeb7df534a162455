//! Table-scoped services.
//!
//! # Responsibility
//! - Bind a repository to one table so callers pass only records/filters.

pub mod table_service;
