//! Index registry: governance identity and versioned account modules.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{LayerError, Result};
use crate::events::Event;
use crate::types::Address;

/// Modules bound to one account version.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VersionInfo {
    /// Account proxy template cloned by `build`.
    pub account: Address,
    /// Connectors registry, zero when the version has none.
    pub connectors: Address,
    /// Optional post-cast validation module.
    pub check: Address,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct IndexRegistry {
    master: Address,
    new_master: Address,
    list: Address,
    version_count: u64,
    versions: BTreeMap<u64, VersionInfo>,
    clones: BTreeMap<u64, BTreeSet<Address>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_master(&self, caller: Address) -> Result<()> {
        if caller != self.master || self.master.is_zero() {
            return Err(LayerError::NotMaster);
        }
        Ok(())
    }

    /// One-time setup; also registers version 1.
    pub fn set_basics(
        &mut self,
        master: Address,
        list: Address,
        account: Address,
        connectors: Address,
    ) -> Result<Event> {
        if !self.master.is_zero() || self.version_count != 0 {
            return Err(LayerError::AlreadyDefined);
        }
        if master.is_zero() || list.is_zero() || account.is_zero() {
            return Err(LayerError::NotValidAddress);
        }
        self.master = master;
        self.list = list;
        self.push_version(VersionInfo { account, connectors, check: Address::ZERO });
        Ok(Event::LogNewAccount {
            new_account: account,
            connectors,
            check: Address::ZERO,
        })
    }

    /// Nominate a successor; the nominee must finalize with `update_master`.
    pub fn change_master(&mut self, caller: Address, new_master: Address) -> Result<Event> {
        self.ensure_master(caller)?;
        if new_master == self.master {
            return Err(LayerError::AlreadyAMaster);
        }
        if new_master.is_zero() {
            return Err(LayerError::NotValidAddress);
        }
        if new_master == self.new_master {
            return Err(LayerError::AlreadyANewMaster);
        }
        self.new_master = new_master;
        Ok(Event::LogNewMaster { master: new_master })
    }

    pub fn update_master(&mut self, caller: Address) -> Result<Event> {
        if self.new_master.is_zero() {
            return Err(LayerError::NotValidAddress);
        }
        if caller != self.new_master {
            return Err(LayerError::NotMaster);
        }
        self.master = self.new_master;
        self.new_master = Address::ZERO;
        Ok(Event::LogUpdateMaster { master: self.master })
    }

    pub fn add_new_account(
        &mut self,
        caller: Address,
        account: Address,
        connectors: Address,
        check: Address,
    ) -> Result<Event> {
        self.ensure_master(caller)?;
        if account.is_zero() {
            return Err(LayerError::NotValidAddress);
        }
        self.push_version(VersionInfo { account, connectors, check });
        Ok(Event::LogNewAccount { new_account: account, connectors, check })
    }

    pub fn change_check(&mut self, caller: Address, version: u64, check: Address) -> Result<Event> {
        self.ensure_master(caller)?;
        let info = self
            .versions
            .get_mut(&version)
            .ok_or(LayerError::NotValidAccount)?;
        if info.check == check {
            return Err(LayerError::AlreadyACheck);
        }
        info.check = check;
        Ok(Event::LogNewCheck { account_version: version, check })
    }

    /// Resolve a version for `build`, rejecting 0 and unknown versions.
    pub fn version_for_build(&self, version: u64) -> Result<VersionInfo> {
        if version == 0 || version > self.version_count {
            return Err(LayerError::NotValidAccount);
        }
        let info = self.version(version);
        if info.account.is_zero() {
            return Err(LayerError::NotValidAccount);
        }
        Ok(info)
    }

    pub fn record_clone(&mut self, version: u64, account: Address) {
        self.clones.entry(version).or_default().insert(account);
    }

    fn push_version(&mut self, info: VersionInfo) {
        self.version_count += 1;
        self.versions.insert(self.version_count, info);
    }

    pub fn is_clone(&self, version: u64, account: &Address) -> bool {
        self.clones
            .get(&version)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }

    pub fn master(&self) -> Address {
        self.master
    }

    pub fn new_master(&self) -> Address {
        self.new_master
    }

    pub fn list(&self) -> Address {
        self.list
    }

    pub fn version_count(&self) -> u64 {
        self.version_count
    }

    pub fn version(&self, version: u64) -> VersionInfo {
        self.versions.get(&version).copied().unwrap_or_default()
    }

    pub fn account(&self, version: u64) -> Address {
        self.version(version).account
    }

    pub fn connectors(&self, version: u64) -> Address {
        self.version(version).connectors
    }

    pub fn check(&self, version: u64) -> Address {
        self.version(version).check
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn basics() -> IndexRegistry {
        let mut index = IndexRegistry::new();
        index
            .set_basics(addr("master"), addr("list"), addr("account"), addr("connectors"))
            .unwrap();
        index
    }

    #[test]
    fn test_set_basics_once() {
        let mut index = basics();
        assert_eq!(index.version_count(), 1);
        assert_eq!(index.account(1), addr("account"));
        assert_eq!(index.connectors(1), addr("connectors"));
        assert_eq!(index.check(1), Address::ZERO);
        assert_eq!(
            index.set_basics(addr("master"), addr("list"), addr("account"), addr("connectors")),
            Err(LayerError::AlreadyDefined)
        );
    }

    #[test]
    fn test_two_phase_handover() {
        let mut index = basics();
        let master = addr("master");
        let next = addr("next");
        let eve = addr("eve");

        assert_eq!(index.change_master(eve, next), Err(LayerError::NotMaster));
        assert_eq!(index.change_master(master, master), Err(LayerError::AlreadyAMaster));
        assert_eq!(index.change_master(master, Address::ZERO), Err(LayerError::NotValidAddress));
        assert_eq!(index.update_master(next), Err(LayerError::NotValidAddress));

        index.change_master(master, next).unwrap();
        assert_eq!(index.master(), master);
        assert_eq!(index.change_master(master, next), Err(LayerError::AlreadyANewMaster));
        // the nominee has no power before finalizing
        assert_eq!(index.change_master(next, master), Err(LayerError::NotMaster));

        assert_eq!(index.update_master(master), Err(LayerError::NotMaster));
        assert_eq!(index.update_master(eve), Err(LayerError::NotMaster));
        assert_eq!(index.master(), master);

        assert_eq!(index.update_master(next).unwrap(), Event::LogUpdateMaster { master: next });
        assert_eq!(index.master(), next);
        assert_eq!(index.new_master(), Address::ZERO);
        assert_eq!(index.update_master(next), Err(LayerError::NotValidAddress));
        // the old master can be nominated again once the slot is clear
        index.change_master(next, master).unwrap();
        assert_eq!(index.new_master(), master);
    }

    #[test]
    fn test_versions_and_checks() {
        let mut index = basics();
        let master = addr("master");
        assert_eq!(
            index.add_new_account(addr("eve"), addr("v2"), Address::ZERO, Address::ZERO),
            Err(LayerError::NotMaster)
        );
        assert_eq!(
            index.add_new_account(master, Address::ZERO, Address::ZERO, Address::ZERO),
            Err(LayerError::NotValidAddress)
        );
        index.add_new_account(master, addr("v2"), Address::ZERO, Address::ZERO).unwrap();
        index.add_new_account(master, addr("v3"), addr("connectors"), addr("check")).unwrap();
        assert_eq!(index.version_count(), 3);
        assert_eq!(index.connectors(2), Address::ZERO);
        assert_eq!(index.check(3), addr("check"));

        assert_eq!(index.change_check(master, 1, Address::ZERO), Err(LayerError::AlreadyACheck));
        assert_eq!(
            index.change_check(master, 1, addr("check")).unwrap(),
            Event::LogNewCheck { account_version: 1, check: addr("check") }
        );
        index.change_check(master, 2, addr("check")).unwrap();
        assert_eq!(index.change_check(master, 9, addr("check")), Err(LayerError::NotValidAccount));
    }

    #[test]
    fn test_version_for_build_bounds() {
        let index = basics();
        assert_eq!(index.version_for_build(0), Err(LayerError::NotValidAccount));
        assert_eq!(index.version_for_build(2), Err(LayerError::NotValidAccount));
        assert!(index.version_for_build(1).is_ok());
    }
}
