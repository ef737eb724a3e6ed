use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::types::{SchemaError, SchemaNode};

/// Core schema registry.
///
/// SchemaCore is responsible for:
/// - Holding named schemas so recursive references can be resolved
/// - Holding per-table document schemas for the secure access facade
/// - Providing shared, immutable access to registered schema trees
///
/// Schemas are immutable once registered; the registry itself is only
/// extended, never mutated in place.
pub struct SchemaCore {
    /// Named schemas, addressable from `NodeKind::Ref` nodes
    schemas: Mutex<HashMap<String, Arc<SchemaNode>>>,
    /// Document schemas keyed by table name
    tables: Mutex<HashMap<String, Arc<SchemaNode>>>,
}

impl SchemaCore {
    pub fn new() -> Self {
        Self {
            schemas: Mutex::new(HashMap::new()),
            tables: Mutex::new(HashMap::new()),
        }
    }

    fn lock_schemas(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<SchemaNode>>>, SchemaError> {
        self.schemas
            .lock()
            .map_err(|_| SchemaError::InvalidData("Cannot lock schema registry".to_string()))
    }

    fn lock_tables(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<SchemaNode>>>, SchemaError> {
        self.tables
            .lock()
            .map_err(|_| SchemaError::InvalidData("Cannot lock table registry".to_string()))
    }

    /// Registers a named schema and returns its shared handle.
    ///
    /// Re-registering a name replaces the previous schema; references resolve
    /// to the latest registration.
    pub fn register_schema(&self, name: &str, schema: SchemaNode) -> Result<Arc<SchemaNode>, SchemaError> {
        let schema = Arc::new(schema);
        let mut schemas = self.lock_schemas()?;
        schemas.insert(name.to_string(), Arc::clone(&schema));
        info!("Registered schema {}", name);
        Ok(schema)
    }

    /// Retrieves a named schema.
    pub fn get_schema(&self, name: &str) -> Result<Option<Arc<SchemaNode>>, SchemaError> {
        let schemas = self.lock_schemas()?;
        Ok(schemas.get(name).cloned())
    }

    /// Resolves a recursive reference, failing when the name is unknown.
    pub fn resolve_ref(&self, name: &str) -> Result<Arc<SchemaNode>, SchemaError> {
        self.get_schema(name)?
            .ok_or_else(|| SchemaError::NotFound(format!("Referenced schema {} is not registered", name)))
    }

    /// Lists the names of all registered schemas.
    pub fn list_schemas(&self) -> Result<Vec<String>, SchemaError> {
        let schemas = self.lock_schemas()?;
        let mut names: Vec<String> = schemas.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Registers the document schema for a table.
    pub fn register_table_schema(&self, table: &str, schema: SchemaNode) -> Result<Arc<SchemaNode>, SchemaError> {
        let schema = Arc::new(schema);
        let mut tables = self.lock_tables()?;
        tables.insert(table.to_string(), Arc::clone(&schema));
        info!("Registered document schema for table {}", table);
        Ok(schema)
    }

    /// Retrieves the document schema registered for a table.
    pub fn table_schema(&self, table: &str) -> Result<Option<Arc<SchemaNode>>, SchemaError> {
        let tables = self.lock_tables()?;
        Ok(tables.get(table).cloned())
    }
}

impl Default for SchemaCore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_schema_resolves() {
        let core = SchemaCore::new();
        core.register_schema("user", SchemaNode::object([("name", SchemaNode::string())]))
            .unwrap();

        assert!(core.get_schema("user").unwrap().is_some());
        assert!(core.resolve_ref("user").is_ok());
    }

    #[test]
    fn unknown_ref_fails() {
        let core = SchemaCore::new();
        let err = core.resolve_ref("ghost").unwrap_err();
        assert!(matches!(err, SchemaError::NotFound(_)));
    }

    #[test]
    fn table_schema_round_trip() {
        let core = SchemaCore::new();
        assert!(core.table_schema("users").unwrap().is_none());
        core.register_table_schema("users", SchemaNode::object([("email", SchemaNode::string())]))
            .unwrap();
        assert!(core.table_schema("users").unwrap().is_some());
    }

    #[test]
    fn list_schemas_is_sorted() {
        let core = SchemaCore::new();
        core.register_schema("b", SchemaNode::string()).unwrap();
        core.register_schema("a", SchemaNode::string()).unwrap();
        assert_eq!(core.list_schemas().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
