//! Account proxies: the call surface, per-account storage, and the built-in
//! implementation modules accounts route to.
//!
//! - `types`: calls, outputs and the storage a proxy owns
//! - `auth`: default implementation (auth set, beta flag, receivers)
//! - `cast`: spell execution engine and its hook/check modules

pub mod auth;
pub mod cast;
pub mod types;

pub use auth::{DefaultImplementation, IMPLEMENTATION_VERSION};
pub use cast::{CastImplementation, CastVariant, FlashLoanHook, MinBalanceCheck};
pub use types::{
    AccountCall, AccountState, AccountStorage, CallInput, CastArgs, CastReceipt, Output,
    ERC1155_BATCH_RECEIVED, ERC1155_RECEIVED, ERC721_RECEIVED,
};
