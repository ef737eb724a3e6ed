use crate::db_operations::StorageError;
use crate::schema::types::SchemaError;
use std::fmt;
use std::io;

/// Unified error type for the entire crate.
///
/// This error type centralizes all possible errors that can occur while
/// applying field- and row-level security, providing a consistent interface
/// for error handling and propagation.
///
/// Each variant represents a specific category of errors, with associated
/// context to help with debugging and error reporting.
#[derive(Debug)]
pub enum ShieldError {
    /// Errors related to schema traversal and validation
    Schema(SchemaError),

    /// Errors related to storage operations
    Database(String),

    /// Errors related to permission checks
    Permission(String),

    /// Errors related to configuration
    Config(String),

    /// A requested document or table was not found
    NotFound(String),

    /// Errors related to IO operations
    Io(io::Error),

    /// Errors related to serialization/deserialization
    Serialization(String),
}

impl fmt::Display for ShieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(err) => write!(f, "Schema error: {}", err),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
            Self::Permission(msg) => write!(f, "Permission error: {}", msg),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ShieldError {}

/// Conversion from SchemaError to ShieldError
impl From<SchemaError> for ShieldError {
    fn from(error: SchemaError) -> Self {
        ShieldError::Schema(error)
    }
}

/// Conversion from io::Error to ShieldError
impl From<io::Error> for ShieldError {
    fn from(error: io::Error) -> Self {
        ShieldError::Io(error)
    }
}

/// Conversion from serde_json::Error to ShieldError
impl From<serde_json::Error> for ShieldError {
    fn from(error: serde_json::Error) -> Self {
        ShieldError::Serialization(error.to_string())
    }
}

/// Conversion from sled::Error to ShieldError
impl From<sled::Error> for ShieldError {
    fn from(error: sled::Error) -> Self {
        ShieldError::Database(error.to_string())
    }
}

/// Conversion from StorageError to ShieldError
///
/// Not-found storage results keep their identity so the facade can
/// distinguish a missing document from a failing backend.
impl From<StorageError> for ShieldError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound { table, id } => {
                ShieldError::NotFound(format!("Document {} not found in table {}", id, table))
            }
            other => ShieldError::Database(other.to_string()),
        }
    }
}

/// Result type alias for operations that can result in a ShieldError
pub type ShieldResult<T> = Result<T, ShieldError>;
