//! Named connector directory with master + chief write access.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{LayerError, Result};
use crate::events::Event;
use crate::types::{Address, H256};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConnectorEntry {
    pub name: String,
    pub connector: Address,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ConnectorsRegistry {
    chief: BTreeSet<Address>,
    /// keccak256(name) -> entry
    connectors: BTreeMap<H256, ConnectorEntry>,
}

fn name_hash(name: &str) -> H256 {
    H256::of(name.as_bytes())
}

impl ConnectorsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_chief(&self, caller: Address, master: Address) -> Result<()> {
        if caller == master || self.chief.contains(&caller) {
            Ok(())
        } else {
            Err(LayerError::NotAChief)
        }
    }

    pub fn toggle_chief(&mut self, caller: Address, master: Address, addr: Address) -> Result<Event> {
        if caller != master {
            return Err(LayerError::ToggleChiefNotMaster);
        }
        let is_chief = if self.chief.remove(&addr) {
            false
        } else {
            self.chief.insert(addr);
            true
        };
        Ok(Event::LogController { addr, is_chief })
    }

    pub fn add_connectors(
        &mut self,
        caller: Address,
        master: Address,
        names: &[String],
        connectors: &[Address],
    ) -> Result<Vec<Event>> {
        self.ensure_chief(caller, master)?;
        if names.len() != connectors.len() {
            return Err(LayerError::NotSameLength("addConnectors"));
        }
        let mut batch = BTreeSet::new();
        for (name, connector) in names.iter().zip(connectors) {
            let hash = name_hash(name);
            if self.connectors.contains_key(&hash) || !batch.insert(hash) {
                return Err(LayerError::ConnectorAddedAlready);
            }
            if connector.is_zero() {
                return Err(LayerError::AddConnectorAddressNotValid);
            }
        }
        let mut events = Vec::with_capacity(names.len());
        for (name, connector) in names.iter().zip(connectors) {
            let hash = name_hash(name);
            self.connectors.insert(
                hash,
                ConnectorEntry { name: name.clone(), connector: *connector },
            );
            events.push(Event::LogConnectorAdded {
                connector_name_hash: hash,
                connector_name: name.clone(),
                connector: *connector,
            });
        }
        Ok(events)
    }

    pub fn update_connectors(
        &mut self,
        caller: Address,
        master: Address,
        names: &[String],
        connectors: &[Address],
    ) -> Result<Vec<Event>> {
        self.ensure_chief(caller, master)?;
        if names.len() != connectors.len() {
            return Err(LayerError::NotSameLength("updateConnectors"));
        }
        for (name, connector) in names.iter().zip(connectors) {
            if !self.connectors.contains_key(&name_hash(name)) {
                return Err(LayerError::ConnectorNotAdded("updateConnectors"));
            }
            if connector.is_zero() {
                return Err(LayerError::UpdateConnectorAddressNotValid);
            }
        }
        let mut events = Vec::with_capacity(names.len());
        for (name, connector) in names.iter().zip(connectors) {
            let hash = name_hash(name);
            if let Some(entry) = self.connectors.get_mut(&hash) {
                let old = std::mem::replace(&mut entry.connector, *connector);
                events.push(Event::LogConnectorUpdated {
                    connector_name_hash: hash,
                    connector_name: name.clone(),
                    old_connector: old,
                    new_connector: *connector,
                });
            }
        }
        Ok(events)
    }

    pub fn remove_connectors(
        &mut self,
        caller: Address,
        master: Address,
        names: &[String],
    ) -> Result<Vec<Event>> {
        self.ensure_chief(caller, master)?;
        let mut batch = BTreeSet::new();
        for name in names {
            let hash = name_hash(name);
            if !self.connectors.contains_key(&hash) || !batch.insert(hash) {
                return Err(LayerError::ConnectorNotAdded("removeConnectors"));
            }
        }
        let mut events = Vec::with_capacity(names.len());
        for name in names {
            let hash = name_hash(name);
            if let Some(entry) = self.connectors.remove(&hash) {
                events.push(Event::LogConnectorRemoved {
                    connector_name_hash: hash,
                    connector_name: entry.name,
                    connector: entry.connector,
                });
            }
        }
        Ok(events)
    }

    /// `(all bound, addresses)`; unbound names resolve to the zero address.
    pub fn is_connectors(&self, names: &[String]) -> (bool, Vec<Address>) {
        let addresses: Vec<Address> = names.iter().map(|n| self.connector(n)).collect();
        let ok = addresses.iter().all(|a| !a.is_zero());
        (ok, addresses)
    }

    pub fn connector(&self, name: &str) -> Address {
        self.connectors
            .get(&name_hash(name))
            .map(|e| e.connector)
            .unwrap_or_default()
    }

    pub fn is_chief(&self, addr: &Address) -> bool {
        self.chief.contains(addr)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConnectorEntry> {
        self.connectors.values()
    }
}
