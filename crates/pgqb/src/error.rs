//! Error types for pgqb

use thiserror::Error;

/// Result type alias for pgqb operations
pub type QbResult<T> = Result<T, QbError>;

/// Error types for statement assembly and execution
#[derive(Debug, Error)]
pub enum QbError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error, passed through from the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Single-row fetch returned no rows
    #[error("Not found: {0}")]
    NotFound(String),

    /// A value had an unexpected type or encoded shape during decoding
    #[error("Bad type on column '{column}': {message}")]
    BadType { column: String, message: String },

    /// No action (SELECT/INSERT/UPDATE/DELETE) was configured
    #[error("Unknown action")]
    UnknownAction,

    /// UPDATE has more columns than bound parameters
    #[error("Too many arguments: {columns} columns but only {params} parameters")]
    TooManyArgs { columns: usize, params: usize },

    /// Deferred construction error (e.g. more values than `?` markers)
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON encode/decode error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl QbError {
    /// Create a bad type error for a specific column
    pub fn bad_type(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadType {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a bad type error
    pub fn is_bad_type(&self) -> bool {
        matches!(self, Self::BadType { .. })
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for QbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
