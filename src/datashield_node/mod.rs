//! # DataShield Node
//!
//! The secure data access facade. A node wraps a minimal storage backend and
//! composes the permissions layer around it: row-level rules gate whole
//! documents before each operation, field-level policies reduce sensitive
//! values after reads, and write policies are asserted strictly before any
//! mutation reaches storage.
//!
//! ## Components
//!
//! * `config` - Node configuration and TOML loading
//! * `node` - Facade construction and schema registration
//! * `reads` - Secured get and query
//! * `writes` - Secured insert, patch and delete
//! * `audit` - Structured denial events for observers

pub mod audit;
pub mod config;
pub mod node;
mod reads;
mod writes;

pub use audit::{DenialEvent, DenialObserver};
pub use config::{load_node_config, NodeConfig};
pub use node::DataShieldNode;
