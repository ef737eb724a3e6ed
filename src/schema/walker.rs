use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ShieldResult;
use crate::permissions::types::SensitivePolicy;

use super::core::SchemaCore;
use super::types::{NodeId, NodeKind, SchemaNode};

/// Signal returned by a visitor to continue into or prune a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFlow {
    Continue,
    Skip,
}

/// Callbacks invoked during a depth-first schema traversal.
///
/// `on_field` fires for every node and may prune its subtree; the composite
/// hooks fire additionally for object, array and union nodes.
pub trait SchemaVisitor {
    fn on_field(&mut self, _path: &str, _node: &Arc<SchemaNode>) -> VisitFlow {
        VisitFlow::Continue
    }

    fn on_object(&mut self, _path: &str, _node: &Arc<SchemaNode>) {}

    fn on_array(&mut self, _path: &str, _node: &Arc<SchemaNode>) {}

    fn on_union(&mut self, _path: &str, _node: &Arc<SchemaNode>) {}
}

/// A schema node located by [`SchemaWalker::find_nodes`].
#[derive(Debug, Clone)]
pub struct FoundNode {
    pub path: String,
    pub node: Arc<SchemaNode>,
}

/// A sensitive schema node and its policy metadata.
#[derive(Debug, Clone)]
pub struct SensitiveField {
    pub path: String,
    pub policy: Arc<SensitivePolicy>,
}

/// Extends a traversal path with an object field key.
pub(crate) fn extend_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Depth-first schema traversal with path tracking and cycle safety.
///
/// Paths extend with `.key` for object fields and `[]` for array elements.
/// Optional, nullable and reference wrappers are unwrapped transparently and
/// leave the path unchanged. Every variant of a union or discriminated union
/// is traversed under the union's own path, so field names stay addressable
/// consistently across variants.
///
/// Cycle safety keys on node identity and is scoped to the current descent
/// path: re-entering a node already above us prunes the revisit, while a node
/// shared by sibling branches is traversed under each branch.
pub struct SchemaWalker<'a> {
    core: &'a SchemaCore,
}

impl<'a> SchemaWalker<'a> {
    pub fn new(core: &'a SchemaCore) -> Self {
        Self { core }
    }

    /// Walks the schema rooted at `schema`, invoking `visitor` callbacks.
    pub fn walk(&self, schema: &Arc<SchemaNode>, visitor: &mut dyn SchemaVisitor) -> ShieldResult<()> {
        let mut visited = HashSet::new();
        self.walk_node(schema, "", visitor, &mut visited)
    }

    fn walk_node(
        &self,
        node: &Arc<SchemaNode>,
        path: &str,
        visitor: &mut dyn SchemaVisitor,
        visited: &mut HashSet<NodeId>,
    ) -> ShieldResult<()> {
        if !visited.insert(node.id()) {
            return Ok(());
        }

        let result = self.walk_children(node, path, visitor, visited);
        visited.remove(&node.id());
        result
    }

    fn walk_children(
        &self,
        node: &Arc<SchemaNode>,
        path: &str,
        visitor: &mut dyn SchemaVisitor,
        visited: &mut HashSet<NodeId>,
    ) -> ShieldResult<()> {
        if visitor.on_field(path, node) == VisitFlow::Skip {
            return Ok(());
        }

        match node.kind() {
            NodeKind::Optional(inner) | NodeKind::Nullable(inner) => {
                self.walk_node(inner, path, visitor, visited)
            }
            NodeKind::Ref(name) => {
                let resolved = self.core.resolve_ref(name)?;
                self.walk_node(&resolved, path, visitor, visited)
            }
            NodeKind::Object(fields) => {
                visitor.on_object(path, node);
                for (key, field) in fields {
                    self.walk_node(field, &extend_path(path, key), visitor, visited)?;
                }
                Ok(())
            }
            NodeKind::Array(element) => {
                visitor.on_array(path, node);
                self.walk_node(element, &format!("{}[]", path), visitor, visited)
            }
            NodeKind::Union(variants) => {
                visitor.on_union(path, node);
                for variant in variants {
                    self.walk_node(variant, path, visitor, visited)?;
                }
                Ok(())
            }
            NodeKind::DiscriminatedUnion { variants, .. } => {
                visitor.on_union(path, node);
                for variant in variants {
                    self.walk_node(variant, path, visitor, visited)?;
                }
                Ok(())
            }
            NodeKind::String
            | NodeKind::Int
            | NodeKind::Float
            | NodeKind::Boolean
            | NodeKind::Null
            | NodeKind::Any
            | NodeKind::Literal(_) => Ok(()),
        }
    }

    /// Finds every node matching `predicate`.
    ///
    /// The first match along each path is treated as a leaf: the finder does
    /// not recurse inside a matched node.
    pub fn find_nodes(
        &self,
        schema: &Arc<SchemaNode>,
        predicate: &dyn Fn(&SchemaNode) -> bool,
    ) -> ShieldResult<Vec<FoundNode>> {
        struct Finder<'p> {
            predicate: &'p dyn Fn(&SchemaNode) -> bool,
            found: Vec<FoundNode>,
        }

        impl SchemaVisitor for Finder<'_> {
            fn on_field(&mut self, path: &str, node: &Arc<SchemaNode>) -> VisitFlow {
                if (self.predicate)(node) {
                    self.found.push(FoundNode {
                        path: path.to_string(),
                        node: Arc::clone(node),
                    });
                    VisitFlow::Skip
                } else {
                    VisitFlow::Continue
                }
            }
        }

        let mut finder = Finder {
            predicate,
            found: Vec::new(),
        };
        self.walk(schema, &mut finder)?;
        Ok(finder.found)
    }

    /// Finds every sensitive node in the schema, including nodes inside
    /// arrays and every branch of unions and discriminated unions.
    pub fn find_sensitive_nodes(&self, schema: &Arc<SchemaNode>) -> ShieldResult<Vec<SensitiveField>> {
        let found = self.find_nodes(schema, &|node| node.is_sensitive())?;
        Ok(found
            .into_iter()
            .filter_map(|entry| {
                entry.node.policy().map(|policy| SensitiveField {
                    path: entry.path,
                    policy: Arc::clone(policy),
                })
            })
            .collect())
    }
}
