use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::account::AccountState;
use crate::events::LogRecord;
use crate::ledger::BuiltinCode;
use crate::registry::{ConnectorsRegistry, ImplementationsRegistry, IndexRegistry, ListRegistry};
use crate::types::Address;

/// Everything the platform persists. Cloned as the rollback point of every
/// transaction.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LedgerState {
    pub index_address: Address,
    pub list_address: Address,
    pub index: IndexRegistry,
    pub list: ListRegistry,
    pub implementations: BTreeMap<Address, ImplementationsRegistry>,
    pub connectors: BTreeMap<Address, ConnectorsRegistry>,
    /// account proxy template -> implementations registry it consults
    pub templates: BTreeMap<Address, Address>,
    pub accounts: BTreeMap<Address, AccountState>,
    pub balances: BTreeMap<Address, u128>,
    pub builtins: BTreeMap<Address, BuiltinCode>,
    pub logs: Vec<LogRecord>,
    pub nonce: u64,
}

impl LedgerState {
    pub fn balance(&self, address: &Address) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }
}
