//! # Value Transformer
//!
//! Schema-guided rewriting of JSON documents. The transformer walks a value
//! and its schema together, invoking a caller-supplied transform at each node
//! and recursing according to the schema shape, never the value's runtime
//! type. It owns the fail-closed handling of union values that match no
//! declared variant.
//!
//! ## Components
//!
//! * `transformer` - Synchronous traversal
//! * `async_transformer` - Asynchronous traversal with sequential or
//!   parallel array processing

pub mod async_transformer;
pub mod transformer;

use serde_json::Value;
use std::sync::Arc;

use crate::permissions::types::SensitivePolicy;
use crate::schema::SchemaNode;

pub use async_transformer::{transform_value_async, AsyncValueTransform};
pub use transformer::transform_value;

/// What to do with a union value that matches no declared variant.
///
/// Ambiguity about a value's true shape must never be resolved in favor of
/// exposing it: the security layer always runs with `Null`, which replaces
/// the entire value at the unmatched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedUnionPolicy {
    /// Leave the value untouched. General-purpose default.
    #[default]
    Passthrough,
    /// Fail the whole transform with a schema error.
    Error,
    /// Replace the entire value at the unmatched path with JSON null.
    Null,
}

/// Callback reporting the path of every unmatched union occurrence.
pub type UnmatchedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Predicate restricting which nodes the transform callback is invoked for.
///
/// Recursion into children is unaffected; the predicate only avoids callback
/// overhead on nodes the caller is not interested in.
pub type ShouldTransform = Arc<dyn Fn(&SchemaNode) -> bool + Send + Sync>;

/// Options shared by the synchronous and asynchronous transformers.
#[derive(Clone, Default)]
pub struct TransformOptions {
    pub unmatched_union: UnmatchedUnionPolicy,
    pub on_unmatched: Option<UnmatchedCallback>,
    pub should_transform: Option<ShouldTransform>,
    /// Process array elements concurrently. Asynchronous traversal only;
    /// results keep their original index order regardless.
    pub parallel: bool,
}

impl TransformOptions {
    /// Options used by the security layer: unmatched unions redact to null.
    pub fn fail_closed() -> Self {
        Self {
            unmatched_union: UnmatchedUnionPolicy::Null,
            ..Self::default()
        }
    }
}

/// Node information handed to the transform callback.
#[derive(Clone, Copy)]
pub struct TransformScope<'a> {
    /// Path of the value being transformed
    pub path: &'a str,
    /// Schema node the value is being transformed against
    pub node: &'a SchemaNode,
    /// Sensitivity metadata of the node, when marked
    pub policy: Option<&'a Arc<SensitivePolicy>>,
    /// Caller-supplied context threaded through the traversal
    pub ctx: &'a Value,
}
