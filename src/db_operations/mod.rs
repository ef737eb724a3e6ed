//! # Storage Operations
//!
//! The minimal storage interface the secure access facade wraps, plus the
//! bundled backends.
//!
//! ## Components
//!
//! * `sled_backend` - Persistent backend over a sled database, one tree per
//!   table
//! * `memory_backend` - In-memory backend for tests (behind the `mock`
//!   feature)

pub mod sled_backend;

#[cfg(feature = "mock")]
pub mod memory_backend;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use sled_backend::SledBackend;

#[cfg(feature = "mock")]
pub use memory_backend::MemoryBackend;

/// Errors that can occur in a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying database errors
    #[error("Database error: {0}")]
    Database(String),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document addressed by id does not exist
    #[error("Document {id} not found in table {table}")]
    NotFound { table: String, id: String },
}

impl From<sled::Error> for StorageError {
    fn from(error: sled::Error) -> Self {
        StorageError::Database(error.to_string())
    }
}

/// Minimal storage interface consumed by the secure access facade.
///
/// Documents are JSON values addressed by table name and document id. The
/// facade performs all security work before delegating here; backends only
/// move bytes.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetches one document.
    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StorageError>;

    /// Fetches every document of a table as `(id, document)` pairs, in
    /// stable id order.
    async fn collect(&self, table: &str) -> Result<Vec<(String, Value)>, StorageError>;

    /// Stores a document, replacing any existing one with the same id.
    async fn insert(&self, table: &str, id: &str, doc: &Value) -> Result<(), StorageError>;

    /// Merges the top-level keys of `fields` into an existing document and
    /// returns the merged result. Fails with [`StorageError::NotFound`] when
    /// the document does not exist.
    async fn patch(&self, table: &str, id: &str, fields: &Value) -> Result<Value, StorageError>;

    /// Deletes a document, reporting whether it existed.
    async fn delete(&self, table: &str, id: &str) -> Result<bool, StorageError>;
}

/// Merges the top-level keys of `fields` into `doc`.
pub(crate) fn merge_document(doc: &Value, fields: &Value) -> Result<Value, StorageError> {
    let Some(base) = doc.as_object() else {
        return Err(StorageError::Database(
            "Cannot patch a non-object document".to_string(),
        ));
    };
    let Some(updates) = fields.as_object() else {
        return Err(StorageError::Database(
            "Patch fields must be an object".to_string(),
        ));
    };
    let mut merged = base.clone();
    for (key, value) in updates {
        merged.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(merged))
}
