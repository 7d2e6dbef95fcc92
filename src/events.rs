//! Ledger log records: the platform's only externally observable history.
//!
//! Variant names and field names follow the deployed contract ABI exactly, so
//! indexers built for the contracts can consume these records unchanged.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Selector, H256};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    // Index
    LogNewMaster {
        master: Address,
    },
    LogUpdateMaster {
        master: Address,
    },
    LogNewCheck {
        #[serde(rename = "accountVersion")]
        account_version: u64,
        check: Address,
    },
    LogNewAccount {
        #[serde(rename = "_newAccount")]
        new_account: Address,
        #[serde(rename = "_connectors")]
        connectors: Address,
        #[serde(rename = "_check")]
        check: Address,
    },
    LogAccountCreated {
        sender: Address,
        owner: Address,
        account: Address,
        origin: Address,
    },

    // Implementations
    LogSetDefaultImplementation {
        #[serde(rename = "oldImplementation")]
        old_implementation: Address,
        #[serde(rename = "newImplementation")]
        new_implementation: Address,
    },
    LogAddImplementation {
        implementation: Address,
        sigs: Vec<Selector>,
    },
    LogRemoveImplementation {
        implementation: Address,
        sigs: Vec<Selector>,
    },

    // Connectors
    LogController {
        addr: Address,
        #[serde(rename = "isChief")]
        is_chief: bool,
    },
    LogConnectorAdded {
        #[serde(rename = "connectorNameHash")]
        connector_name_hash: H256,
        #[serde(rename = "connectorName")]
        connector_name: String,
        connector: Address,
    },
    LogConnectorUpdated {
        #[serde(rename = "connectorNameHash")]
        connector_name_hash: H256,
        #[serde(rename = "connectorName")]
        connector_name: String,
        #[serde(rename = "oldConnector")]
        old_connector: Address,
        #[serde(rename = "newConnector")]
        new_connector: Address,
    },
    LogConnectorRemoved {
        #[serde(rename = "connectorNameHash")]
        connector_name_hash: H256,
        #[serde(rename = "connectorName")]
        connector_name: String,
        connector: Address,
    },

    // Account
    LogEnableUser {
        user: Address,
    },
    LogDisableUser {
        user: Address,
    },
    LogBetaMode {
        beta: bool,
    },
    LogCast {
        origin: Address,
        sender: Address,
        value: u128,
        #[serde(rename = "targetsNames")]
        targets_names: Vec<String>,
        targets: Vec<Address>,
        #[serde(rename = "eventNames")]
        event_names: Vec<String>,
        #[serde(rename = "eventParams")]
        event_params: Vec<Vec<u8>>,
    },

    /// Structured event raised by connector code on behalf of the account.
    Connector {
        signature: String,
        params: Vec<u8>,
    },
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::LogNewMaster { .. } => "LogNewMaster",
            Event::LogUpdateMaster { .. } => "LogUpdateMaster",
            Event::LogNewCheck { .. } => "LogNewCheck",
            Event::LogNewAccount { .. } => "LogNewAccount",
            Event::LogAccountCreated { .. } => "LogAccountCreated",
            Event::LogSetDefaultImplementation { .. } => "LogSetDefaultImplementation",
            Event::LogAddImplementation { .. } => "LogAddImplementation",
            Event::LogRemoveImplementation { .. } => "LogRemoveImplementation",
            Event::LogController { .. } => "LogController",
            Event::LogConnectorAdded { .. } => "LogConnectorAdded",
            Event::LogConnectorUpdated { .. } => "LogConnectorUpdated",
            Event::LogConnectorRemoved { .. } => "LogConnectorRemoved",
            Event::LogEnableUser { .. } => "LogEnableUser",
            Event::LogDisableUser { .. } => "LogDisableUser",
            Event::LogBetaMode { .. } => "LogBetaMode",
            Event::LogCast { .. } => "LogCast",
            Event::Connector { signature, .. } => {
                signature.split('(').next().unwrap_or(signature.as_str())
            }
        }
    }
}

/// An event together with the address that emitted it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub emitter: Address,
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_match_abi() {
        let ev = Event::LogNewAccount {
            new_account: Address::ZERO,
            connectors: Address::ZERO,
            check: Address::ZERO,
        };
        let json = serde_json::to_value(&ev).unwrap();
        let fields = json.get("LogNewAccount").unwrap();
        assert!(fields.get("_newAccount").is_some());
        assert!(fields.get("_connectors").is_some());
        assert!(fields.get("_check").is_some());
    }

    #[test]
    fn test_connector_event_name() {
        let ev = Event::Connector {
            signature: "LogAddAuth(address,address)".into(),
            params: vec![],
        };
        assert_eq!(ev.name(), "LogAddAuth");
    }
}
