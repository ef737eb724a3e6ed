use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::permissions::types::SensitivePolicy;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a schema node.
///
/// Assigned once at construction. Two structurally identical nodes built
/// separately carry distinct identities; clones share the original's.
/// Traversal cycle detection keys on this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Closed set of schema node kinds.
///
/// Every traversal in the crate matches exhaustively over this enum so that a
/// newly added kind cannot silently skip a sensitive field.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// UTF-8 string value
    String,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// Boolean value
    Boolean,
    /// JSON null
    Null,
    /// Any value; never descended into
    Any,
    /// Exact literal value, used for discriminator tags
    Literal(Value),
    /// Object with a fixed set of declared fields
    Object(BTreeMap<String, Arc<SchemaNode>>),
    /// Homogeneous array
    Array(Arc<SchemaNode>),
    /// Field that may be absent from its containing object
    Optional(Arc<SchemaNode>),
    /// Value that may be JSON null
    Nullable(Arc<SchemaNode>),
    /// Untagged union; variants are tried in declaration order
    Union(Vec<Arc<SchemaNode>>),
    /// Union whose active variant is selected by a literal in `tag`
    DiscriminatedUnion {
        tag: String,
        variants: Vec<Arc<SchemaNode>>,
    },
    /// Named reference to a schema registered in a SchemaCore
    Ref(String),
}

/// One node of a schema tree.
///
/// Nodes are immutable after construction. Sensitivity metadata is attached
/// at definition time through [`SchemaNode::with_policy`] and never changes
/// afterwards; attaching it does not alter structural validation behavior.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    id: NodeId,
    kind: NodeKind,
    policy: Option<Arc<SensitivePolicy>>,
}

impl SchemaNode {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            policy: None,
        }
    }

    pub fn string() -> Self {
        Self::with_kind(NodeKind::String)
    }

    pub fn int() -> Self {
        Self::with_kind(NodeKind::Int)
    }

    pub fn float() -> Self {
        Self::with_kind(NodeKind::Float)
    }

    pub fn boolean() -> Self {
        Self::with_kind(NodeKind::Boolean)
    }

    pub fn null() -> Self {
        Self::with_kind(NodeKind::Null)
    }

    pub fn any() -> Self {
        Self::with_kind(NodeKind::Any)
    }

    pub fn literal(value: Value) -> Self {
        Self::with_kind(NodeKind::Literal(value))
    }

    pub fn object<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, SchemaNode)>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, node)| (name.to_string(), Arc::new(node)))
            .collect();
        Self::with_kind(NodeKind::Object(fields))
    }

    /// Object constructor for field names built at runtime.
    pub fn object_named<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (String, SchemaNode)>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, node)| (name, Arc::new(node)))
            .collect();
        Self::with_kind(NodeKind::Object(fields))
    }

    pub fn array(element: SchemaNode) -> Self {
        Self::with_kind(NodeKind::Array(Arc::new(element)))
    }

    pub fn optional(inner: SchemaNode) -> Self {
        Self::with_kind(NodeKind::Optional(Arc::new(inner)))
    }

    pub fn nullable(inner: SchemaNode) -> Self {
        Self::with_kind(NodeKind::Nullable(Arc::new(inner)))
    }

    pub fn union(variants: Vec<SchemaNode>) -> Self {
        Self::with_kind(NodeKind::Union(variants.into_iter().map(Arc::new).collect()))
    }

    pub fn discriminated_union(tag: &str, variants: Vec<SchemaNode>) -> Self {
        Self::with_kind(NodeKind::DiscriminatedUnion {
            tag: tag.to_string(),
            variants: variants.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn reference(name: &str) -> Self {
        Self::with_kind(NodeKind::Ref(name.to_string()))
    }

    /// Marks this node sensitive by attaching its policy metadata.
    ///
    /// Must be called at definition time, before the node is shared.
    pub fn with_policy(mut self, policy: SensitivePolicy) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Policy metadata attached to this node, if it was marked sensitive.
    pub fn policy(&self) -> Option<&Arc<SensitivePolicy>> {
        self.policy.as_ref()
    }

    pub fn is_sensitive(&self) -> bool {
        self.policy.is_some()
    }
}
