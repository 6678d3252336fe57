//! Error types for tabular pipeline operations

use thiserror::Error;

/// Result type for tabular pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tabular pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied configuration is invalid (bad batch size, worker
    /// count, threshold); never retried
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Column not found in the dataset
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Column length does not match the dataset row count
    #[error("Length mismatch for column '{column}': expected {expected}, got {actual}")]
    LengthMismatch {
        /// Name of the offending column
        column: String,
        /// Expected number of rows
        expected: usize,
        /// Actual number of rows
        actual: usize,
    },

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Data type mismatch
    #[error("Data type mismatch: {0}")]
    TypeMismatch(String),

    /// Index out of bounds
    #[error("Index out of bounds")]
    IndexOutOfBounds,

    /// Error raised by a caller-supplied batch transform
    #[error("Transform error: {0}")]
    Transform(String),
}
