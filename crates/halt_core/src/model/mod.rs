//! Record shapes exchanged with callers.
//!
//! # Responsibility
//! - Define the flat field->value mapping used for writes and reads.
//! - Convert between JSON values and SQLite storage values.
//! - Describe which rows an update/delete/load call addresses.

pub mod record;
