//! # Schema System
//!
//! The schema module defines the traversal shape this crate consumes from the
//! schema-definition layer, together with the generic machinery that walks it.
//!
//! ## Components
//!
//! * `core` - Named schema registry and per-table document schemas
//! * `walker` - Depth-first traversal with path tracking and cycle safety
//! * `validator` - Structural value-vs-schema conformance checking
//! * `types` - Schema node representation and error types

pub mod core;
pub mod types;
pub mod validator;
pub mod walker;

pub use self::core::SchemaCore;
pub use types::{NodeId, NodeKind, SchemaError, SchemaNode};
pub use validator::conforms;
pub use walker::{FoundNode, SchemaVisitor, SchemaWalker, SensitiveField, VisitFlow};
