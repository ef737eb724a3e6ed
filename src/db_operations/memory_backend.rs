use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::{merge_document, StorageBackend, StorageError};

/// In-memory storage backend for tests.
///
/// Documents are kept per table in id order, matching the collect ordering
/// of the sled backend.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, BTreeMap<String, Value>>) -> T,
    ) -> Result<T, StorageError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| StorageError::Database("Cannot lock memory backend".to_string()))?;
        Ok(f(&mut tables))
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StorageError> {
        self.with_tables(|tables| tables.get(table).and_then(|docs| docs.get(id)).cloned())
    }

    async fn collect(&self, table: &str) -> Result<Vec<(String, Value)>, StorageError> {
        self.with_tables(|tables| {
            tables
                .get(table)
                .map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
                .unwrap_or_default()
        })
    }

    async fn insert(&self, table: &str, id: &str, doc: &Value) -> Result<(), StorageError> {
        self.with_tables(|tables| {
            tables
                .entry(table.to_string())
                .or_default()
                .insert(id.to_string(), doc.clone());
        })
    }

    async fn patch(&self, table: &str, id: &str, fields: &Value) -> Result<Value, StorageError> {
        let existing = self.get(table, id).await?.ok_or_else(|| StorageError::NotFound {
            table: table.to_string(),
            id: id.to_string(),
        })?;
        let merged = merge_document(&existing, fields)?;
        self.insert(table, id, &merged).await?;
        Ok(merged)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, StorageError> {
        self.with_tables(|tables| {
            tables
                .get_mut(table)
                .map_or(false, |docs| docs.remove(id).is_some())
        })
    }
}
