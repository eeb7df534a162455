//! Per-call behaviour knobs for record writes and reads.
//!
//! # Invariants
//! - `extension_column` names the single column that holds the JSON blob.
//! - With `mash` disabled, fields without a declared column are dropped.

use serde::{Deserialize, Serialize};

/// Column name used for the extension blob unless configured otherwise.
pub const DEFAULT_EXTENSION_COLUMN: &str = "MashConfig";

/// Settings shared by repository and free-function calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaltConfig {
    /// Reserved TEXT column that stores overflow fields as a JSON object.
    pub extension_column: String,
    /// Whether undeclared fields are folded into the extension column.
    pub mash: bool,
}

impl Default for HaltConfig {
    fn default() -> Self {
        Self {
            extension_column: DEFAULT_EXTENSION_COLUMN.to_string(),
            mash: true,
        }
    }
}

impl HaltConfig {
    pub fn with_extension_column(mut self, column: impl Into<String>) -> Self {
        self.extension_column = column.into();
        self
    }

    pub fn with_mash(mut self, mash: bool) -> Self {
        self.mash = mash;
        self
    }
}
