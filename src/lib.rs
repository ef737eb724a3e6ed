//! # DataShield Library
//!
//! This library implements a field-level security engine over
//! schema-described JSON documents. It marks specific fields of structured
//! documents as sensitive and, at read or write time, reduces each sensitive
//! value to the access level a given caller is entitled to (full value,
//! masked value, or hidden), while gating whole-document access through
//! row-level predicates.
//!
//! ## Core Components
//!
//! * `schema` - Schema node representation, registry, walker and validator
//! * `permissions` - Policy metadata, resolution, application and row rules
//! * `transform` - Schema-guided value transformation, sync and async
//! * `sensitive` - Sensitive runtime values, wire envelopes, at-rest wrappers
//! * `db_operations` - Minimal storage interface and bundled backends
//! * `datashield_node` - Secure data access facade over a storage backend
//! * `error` - Error types and handling
//!
//! ## Architecture
//!
//! Schemas attach policy metadata to nodes at definition time. At request
//! time a document and its schema enter the policy applier, which walks the
//! document via the transformer, consults the pluggable entitlement resolver
//! at every sensitive node, and produces a redacted document in wire-envelope
//! form. The node facade sits above storage, applying row-level security
//! before and field-level security after each operation.
//!
//! The engine is fail-closed throughout: a union value matching no declared
//! variant, an erroring entitlement check, or an erroring row predicate all
//! resolve to the most restrictive outcome, never to exposure.

pub mod datashield_node;
pub mod db_operations;
pub mod error;
pub mod permissions;
pub mod schema;
pub mod sensitive;
pub mod testing;
pub mod transform;

// Re-export main types for convenience
pub use datashield_node::config::load_node_config;
pub use datashield_node::config::NodeConfig;
pub use datashield_node::{DataShieldNode, DenialEvent};
pub use db_operations::{SledBackend, StorageBackend};
pub use error::{ShieldError, ShieldResult};
pub use permissions::types::{
    AccessContext, AccessStatus, ReadPolicyTier, SensitivePolicy, TierStatus, Verdict, WritePolicy,
};
pub use permissions::{
    ApplyOptions, AsyncEntitlementResolver, AsyncRowPolicy, EntitlementResolver, PolicyApplier,
    PolicyResolver, RowPolicy,
};
pub use schema::{NodeKind, SchemaCore, SchemaError, SchemaNode, SchemaWalker};
pub use sensitive::{SensitiveEnvelope, SensitiveValue};
pub use transform::{TransformOptions, UnmatchedUnionPolicy};
