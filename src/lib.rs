pub mod account;
pub mod cli;
pub mod config;
pub mod connectors;
pub mod deploy;
pub mod encoding;
pub mod error;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod storage;
pub mod types;

pub use deploy::Deployment;
pub use error::{LayerError, Result};
pub use ledger::Ledger;
pub use types::{Address, Selector, H256};
