// Re-export types needed for testing
pub use crate::datashield_node::{DataShieldNode, DenialEvent, DenialObserver, NodeConfig};
pub use crate::error::{ShieldError, ShieldResult};
pub use crate::db_operations::{SledBackend, StorageBackend, StorageError};
pub use crate::permissions::types::{
    builtin_mask, AccessContext, AccessStatus, DeniedField, Mask, Operation, ReadDecision,
    ReadPolicyTier, RowDecision, RowOperation, SensitivePolicy, TierStatus, Verdict,
    WriteDecision, WritePolicy, WriteValidation,
};
pub use crate::permissions::{
    check_row_access, check_row_access_async, filter_by_row_policy, filter_by_row_policy_async,
    ApplyOptions, AsyncEntitlementResolver, AsyncRowPolicy, AsyncRowRule, EntitlementResolver,
    PolicyApplier, PolicyResolver, RowAccess, RowPolicy, RESOLVER_ERROR_REASON,
};
pub use crate::schema::{
    conforms, NodeKind, SchemaCore, SchemaError, SchemaNode, SchemaVisitor, SchemaWalker,
    SensitiveField, VisitFlow,
};
pub use crate::sensitive::{
    is_storage_wrapper, unwrap_document, unwrap_value, wrap_document, wrap_value,
    SensitiveEnvelope, SensitiveValue, REDACTED_PLACEHOLDER,
};
pub use crate::transform::{
    transform_value, transform_value_async, AsyncValueTransform, TransformOptions, TransformScope,
    UnmatchedUnionPolicy,
};

#[cfg(feature = "mock")]
pub use crate::db_operations::MemoryBackend;

use serde_json::Value;

pub fn create_test_value(value: &str) -> Value {
    serde_json::from_str(value).unwrap()
}
