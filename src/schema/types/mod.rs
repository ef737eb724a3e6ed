pub mod errors;
pub mod node;

pub use errors::SchemaError;
pub use node::{NodeId, NodeKind, SchemaNode};
