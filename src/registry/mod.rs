//! The four platform registries. Each is plain state plus validation; callers
//! pass in who is calling and who the master is, and get back the log records
//! to emit.

pub mod connectors;
pub mod implementations;
pub mod index;
pub mod list;

pub use connectors::{ConnectorEntry, ConnectorsRegistry};
pub use implementations::ImplementationsRegistry;
pub use index::{IndexRegistry, VersionInfo};
pub use list::{Link, LinkedLists, ListRegistry, Node};
