use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::Result;
use crate::ledger::LedgerState;

const STATE_KEY: &str = "state";
const ROOT_KEY: &str = "state_root";

pub struct Storage {
    db: sled::Db,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Storage { db })
    }

    /// Throwaway database, removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Storage { db })
    }

    // Generic Helper: Put
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let serialized = bincode::serialize(value)?;
        self.db.insert(key.as_bytes(), serialized)?;
        Ok(())
    }

    // Generic Helper: Get
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    /// Persist the whole ledger state and its root. Returns the root.
    pub fn save_state(&self, state: &LedgerState) -> Result<String> {
        let root = state_root(state)?;
        self.put(STATE_KEY, state)?;
        self.put(ROOT_KEY, &root)?;
        self.db.flush()?;
        tracing::debug!(%root, logs = state.logs.len(), "state saved");
        Ok(root)
    }

    pub fn load_state(&self) -> Result<Option<LedgerState>> {
        self.get(STATE_KEY)
    }

    pub fn saved_root(&self) -> Result<Option<String>> {
        self.get(ROOT_KEY)
    }
}

/// sha256 over the bincode encoding of the state, hex encoded.
pub fn state_root(state: &LedgerState) -> Result<String> {
    let bytes = bincode::serialize(state)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use crate::deploy::Deployment;
    use crate::ledger::Ledger;
    use crate::types::Address;

    #[test]
    fn test_state_survives_reload() {
        let storage = Storage::temporary().unwrap();
        assert!(storage.load_state().unwrap().is_none());

        let mut ledger = Ledger::new();
        let master = Address::from_label("master");
        Deployment::standard(&mut ledger, master, &LayerConfig::default()).unwrap();
        let owner = Address::from_label("owner");
        let account = ledger.build(owner, owner, 1, owner).unwrap();

        let root = storage.save_state(ledger.state()).unwrap();
        assert_eq!(storage.saved_root().unwrap(), Some(root.clone()));

        let state = storage.load_state().unwrap().unwrap();
        assert_eq!(state_root(&state).unwrap(), root);
        let reloaded = Ledger::from_state(state);
        assert!(reloaded.is_auth(&account, &owner));
        assert_eq!(reloaded.list().user_link(&owner).count, 1);
        assert_eq!(reloaded.logs().len(), ledger.logs().len());
    }

    #[test]
    fn test_reloaded_ledger_can_still_dispatch() {
        let storage = Storage::temporary().unwrap();
        let mut ledger = Ledger::new();
        let master = Address::from_label("master");
        Deployment::standard(&mut ledger, master, &LayerConfig::default()).unwrap();
        storage.save_state(ledger.state()).unwrap();

        let mut reloaded = Ledger::from_state(storage.load_state().unwrap().unwrap());
        let owner = Address::from_label("owner");
        // build routes `enable` through the rehydrated default implementation
        let account = reloaded.build(owner, owner, 1, owner).unwrap();
        assert!(reloaded.is_auth(&account, &owner));
    }
}
