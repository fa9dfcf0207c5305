//! Batch-level error types.
//!
//! Per-operation failures never surface here; they become terminal
//! `failed` operations in the report. A [`BatchError`] means the whole
//! call was rejected before any operation ran.

use thiserror::Error;

/// Structural problems with a batch source. Any of these aborts the batch
/// before a single operation is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Tabular input without a header row plus at least one data row.
    #[error("tabular batch input requires a header and at least one operation row")]
    MissingRows,

    /// A tabular row whose field count differs from the header.
    #[error("row {row}: expected {expected} fields from the header, found {found}")]
    FieldCountMismatch {
        /// 1-based data row number.
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Tabular input the CSV reader could not tokenise.
    #[error("row {row}: malformed table input: {reason}")]
    InvalidTable {
        /// 1-based data row number; 0 for the header.
        row: usize,
        reason: String,
    },

    /// A record or row with no `kind` / `command` value.
    #[error("operation {index}: missing 'kind' or 'command' value")]
    MissingKind {
        /// 1-based operation index.
        index: usize,
    },

    /// Record input that is not a JSON array of objects.
    #[error("invalid record input: {reason}")]
    InvalidRecords { reason: String },

    /// Two operations share the same id.
    #[error("duplicate operation id '{id}' at operation {index}")]
    DuplicateId { id: String, index: usize },

    /// Zero records.
    #[error("batch contains no operations")]
    Empty,
}

/// Errors that abort a whole `process_batch` call.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Batch source was malformed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Top-level options were rejected.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Reading input or writing a report failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration could not be read.
    #[error("config error: {0}")]
    Config(String),
}

impl BatchError {
    /// Returns `true` if the input itself was malformed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
