use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use super::{merge_document, StorageBackend, StorageError};

/// Storage backend over a sled database.
///
/// Each table is a sled tree; documents are stored as JSON bytes keyed by
/// document id. Writes are flushed so the data is durably on disk when the
/// call returns.
#[derive(Clone)]
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    /// Wraps an already opened sled database.
    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }

    /// Opens (or creates) a sled database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn table_tree(&self, table: &str) -> Result<sled::Tree, StorageError> {
        Ok(self.db.open_tree(table)?)
    }

    fn decode(bytes: &[u8]) -> Result<Value, StorageError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[async_trait]
impl StorageBackend for SledBackend {
    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StorageError> {
        let tree = self.table_tree(table)?;
        match tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn collect(&self, table: &str) -> Result<Vec<(String, Value)>, StorageError> {
        let tree = self.table_tree(table)?;
        let mut docs = Vec::new();
        for entry in tree.iter() {
            let (key, bytes) = entry?;
            let id = String::from_utf8_lossy(&key).to_string();
            docs.push((id, Self::decode(&bytes)?));
        }
        Ok(docs)
    }

    async fn insert(&self, table: &str, id: &str, doc: &Value) -> Result<(), StorageError> {
        let tree = self.table_tree(table)?;
        let bytes = serde_json::to_vec(doc)?;
        tree.insert(id.as_bytes(), bytes)?;
        tree.flush()?;
        Ok(())
    }

    async fn patch(&self, table: &str, id: &str, fields: &Value) -> Result<Value, StorageError> {
        let tree = self.table_tree(table)?;
        let Some(bytes) = tree.get(id.as_bytes())? else {
            return Err(StorageError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        };
        let merged = merge_document(&Self::decode(&bytes)?, fields)?;
        tree.insert(id.as_bytes(), serde_json::to_vec(&merged)?)?;
        tree.flush()?;
        Ok(merged)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, StorageError> {
        let tree = self.table_tree(table)?;
        let existed = tree.remove(id.as_bytes())?.is_some();
        tree.flush()?;
        Ok(existed)
    }
}
