//! Error types for pgweave

use thiserror::Error;

/// Result type alias for pgweave operations
pub type WeaveResult<T> = Result<T, WeaveError>;

/// Error types for statement construction and execution
#[derive(Debug, Error)]
pub enum WeaveError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error, passed through from the driver unchanged
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Structural misuse of a builder (programmer error, never retried):
    /// unresolved parent reference, ragged multi-row insert, empty conflict
    /// target, and the like
    #[error("Structural error: {0}")]
    Structural(String),

    /// A query built with `select_exactly_one` matched zero or multiple rows
    #[error("Expected exactly one row from '{table}', got {got}")]
    NotExactlyOne { table: String, got: usize },

    /// Result decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl WeaveError {
    /// Create a structural (programmer) error
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not-exactly-one error for a table
    pub fn not_exactly_one(table: impl Into<String>, got: usize) -> Self {
        Self::NotExactlyOne {
            table: table.into(),
            got,
        }
    }

    /// Check if this is a not-exactly-one error
    pub fn is_not_exactly_one(&self) -> bool {
        matches!(self, Self::NotExactlyOne { .. })
    }

    /// Check if this is a structural error
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for WeaveError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
