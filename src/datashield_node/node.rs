use std::sync::Arc;

use crate::db_operations::{SledBackend, StorageBackend};
use crate::error::ShieldResult;
use crate::permissions::{AsyncEntitlementResolver, PolicyResolver};
use crate::schema::{SchemaCore, SchemaNode};

use super::audit::{DenialEvent, DenialObserver};
use super::config::NodeConfig;

/// Secure data access facade.
///
/// Wraps a minimal storage backend and applies row-level security before and
/// field-level security after each operation. The node owns the schema
/// registry and the entitlement resolver; row rule sets are supplied fresh
/// per call by the caller.
pub struct DataShieldNode {
    pub(crate) config: NodeConfig,
    pub(crate) backend: Arc<dyn StorageBackend>,
    pub(crate) schema_core: Arc<SchemaCore>,
    pub(crate) entitlements: Arc<dyn AsyncEntitlementResolver>,
    pub(crate) observer: Option<DenialObserver>,
}

impl DataShieldNode {
    /// Creates a node over an already constructed storage backend.
    pub fn new(
        config: NodeConfig,
        backend: Arc<dyn StorageBackend>,
        entitlements: Arc<dyn AsyncEntitlementResolver>,
    ) -> Self {
        Self {
            config,
            backend,
            schema_core: Arc::new(SchemaCore::new()),
            entitlements,
            observer: None,
        }
    }

    /// Creates a node backed by a sled database at the configured storage
    /// path.
    pub fn open(
        config: NodeConfig,
        entitlements: Arc<dyn AsyncEntitlementResolver>,
    ) -> ShieldResult<Self> {
        let backend = Arc::new(SledBackend::open(&config.storage_path)?);
        Ok(Self::new(config, backend, entitlements))
    }

    /// Shared schema registry of this node.
    pub fn schema_core(&self) -> &Arc<SchemaCore> {
        &self.schema_core
    }

    /// Registers the document schema used for field-level security on a
    /// table. Tables without a registered schema are served unredacted.
    pub fn register_table_schema(
        &self,
        table: &str,
        schema: SchemaNode,
    ) -> ShieldResult<Arc<SchemaNode>> {
        Ok(self.schema_core.register_table_schema(table, schema)?)
    }

    /// Installs the denial observer receiving structured audit events.
    #[must_use]
    pub fn with_denial_observer(mut self, observer: DenialObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub(crate) fn policy_resolver(&self) -> PolicyResolver {
        match &self.config.default_deny_reason {
            Some(reason) => PolicyResolver::new().with_default_deny_reason(reason),
            None => PolicyResolver::new(),
        }
    }

    pub(crate) fn emit_denial(&self, event: DenialEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}
