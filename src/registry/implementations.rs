//! Selector routing table for account proxies.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{LayerError, Result};
use crate::events::Event;
use crate::types::{Address, Selector};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ImplementationsRegistry {
    default_implementation: Address,
    sig_implementations: BTreeMap<Selector, Address>,
    implementation_sigs: BTreeMap<Address, Vec<Selector>>,
}

impl ImplementationsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default_implementation(
        &mut self,
        caller: Address,
        master: Address,
        implementation: Address,
    ) -> Result<Event> {
        if caller != master {
            return Err(LayerError::ImplementationsNotMaster);
        }
        if implementation.is_zero() {
            return Err(LayerError::DefaultImplementationNotValid);
        }
        if implementation == self.default_implementation {
            return Err(LayerError::DefaultImplementationSame);
        }
        let old = std::mem::replace(&mut self.default_implementation, implementation);
        Ok(Event::LogSetDefaultImplementation {
            old_implementation: old,
            new_implementation: implementation,
        })
    }

    /// All-or-nothing: every selector is checked before any route is written.
    pub fn add_implementation(
        &mut self,
        caller: Address,
        master: Address,
        implementation: Address,
        sigs: Vec<Selector>,
    ) -> Result<Event> {
        if caller != master {
            return Err(LayerError::ImplementationsNotMaster);
        }
        if implementation.is_zero() {
            return Err(LayerError::ImplementationNotValid);
        }
        if self.implementation_sigs.contains_key(&implementation) {
            return Err(LayerError::ImplementationAlreadyAdded);
        }
        let mut seen = BTreeSet::new();
        for sig in &sigs {
            if self.sig_implementations.contains_key(sig) || !seen.insert(*sig) {
                return Err(LayerError::SigAlreadyAdded);
            }
        }
        for sig in &sigs {
            self.sig_implementations.insert(*sig, implementation);
        }
        self.implementation_sigs.insert(implementation, sigs.clone());
        Ok(Event::LogAddImplementation { implementation, sigs })
    }

    pub fn remove_implementation(
        &mut self,
        caller: Address,
        master: Address,
        implementation: Address,
    ) -> Result<Event> {
        if caller != master {
            return Err(LayerError::ImplementationsNotMaster);
        }
        if implementation.is_zero() {
            return Err(LayerError::ImplementationNotValid);
        }
        let sigs = self
            .implementation_sigs
            .remove(&implementation)
            .ok_or(LayerError::ImplementationNotFound)?;
        for sig in &sigs {
            self.sig_implementations.remove(sig);
        }
        Ok(Event::LogRemoveImplementation { implementation, sigs })
    }

    /// Routed module for `sig`, falling back to the default (possibly zero).
    pub fn get_implementation(&self, sig: &Selector) -> Address {
        self.sig_implementations
            .get(sig)
            .copied()
            .unwrap_or(self.default_implementation)
    }

    pub fn get_sig_implementation(&self, sig: &Selector) -> Address {
        self.sig_implementations.get(sig).copied().unwrap_or_default()
    }

    pub fn get_implementation_sigs(&self, implementation: &Address) -> Vec<Selector> {
        self.implementation_sigs
            .get(implementation)
            .cloned()
            .unwrap_or_default()
    }

    pub fn default_implementation(&self) -> Address {
        self.default_implementation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn master() -> Address {
        Address::from_label("master")
    }

    fn sig(s: &str) -> Selector {
        Selector::from_signature(s)
    }

    #[test]
    fn test_default_implementation_rules() {
        let mut reg = ImplementationsRegistry::new();
        let default = Address::from_label("default");
        assert_eq!(
            reg.set_default_implementation(Address::from_label("eve"), master(), default),
            Err(LayerError::ImplementationsNotMaster)
        );
        assert_eq!(
            reg.set_default_implementation(master(), master(), Address::ZERO),
            Err(LayerError::DefaultImplementationNotValid)
        );
        let ev = reg.set_default_implementation(master(), master(), default).unwrap();
        assert_eq!(
            ev,
            Event::LogSetDefaultImplementation {
                old_implementation: Address::ZERO,
                new_implementation: default
            }
        );
        assert_eq!(
            reg.set_default_implementation(master(), master(), default),
            Err(LayerError::DefaultImplementationSame)
        );
    }

    #[test]
    fn test_duplicate_selector_is_rejected_atomically() {
        let mut reg = ImplementationsRegistry::new();
        let m1 = Address::from_label("m1");
        let m2 = Address::from_label("m2");
        let cast = sig("cast(string[],bytes[],address)");
        reg.add_implementation(master(), master(), m1, vec![cast]).unwrap();

        let err = reg
            .add_implementation(master(), master(), m2, vec![sig("connectorsM2()"), cast])
            .unwrap_err();
        assert_eq!(err, LayerError::SigAlreadyAdded);
        assert_eq!(reg.get_implementation(&cast), m1);
        assert_eq!(reg.get_sig_implementation(&sig("connectorsM2()")), Address::ZERO);
        assert!(reg.get_implementation_sigs(&m2).is_empty());

        assert_eq!(
            reg.add_implementation(master(), master(), m1, vec![sig("other()")]),
            Err(LayerError::ImplementationAlreadyAdded)
        );
        assert_eq!(
            reg.add_implementation(master(), master(), m2, vec![sig("a()"), sig("a()")]),
            Err(LayerError::SigAlreadyAdded)
        );
    }

    #[test]
    fn test_default_fallback_follows_default_changes() {
        let mut reg = ImplementationsRegistry::new();
        let d1 = Address::from_label("d1");
        let d2 = Address::from_label("d2");
        let unrouted = sig("isAuth(address)");
        assert_eq!(reg.get_implementation(&unrouted), Address::ZERO);
        reg.set_default_implementation(master(), master(), d1).unwrap();
        assert_eq!(reg.get_implementation(&unrouted), d1);
        reg.set_default_implementation(master(), master(), d2).unwrap();
        assert_eq!(reg.get_implementation(&unrouted), d2);
        assert_eq!(reg.get_sig_implementation(&unrouted), Address::ZERO);
    }

    #[test]
    fn test_remove_clears_routes() {
        let mut reg = ImplementationsRegistry::new();
        let m = Address::from_label("m");
        let sigs = vec![sig("a()"), sig("b()")];
        reg.add_implementation(master(), master(), m, sigs.clone()).unwrap();
        assert_eq!(
            reg.remove_implementation(master(), master(), Address::ZERO),
            Err(LayerError::ImplementationNotValid)
        );
        assert_eq!(
            reg.remove_implementation(master(), master(), Address::from_label("x")),
            Err(LayerError::ImplementationNotFound)
        );
        let ev = reg.remove_implementation(master(), master(), m).unwrap();
        assert_eq!(ev, Event::LogRemoveImplementation { implementation: m, sigs: sigs.clone() });
        for s in &sigs {
            assert_eq!(reg.get_sig_implementation(s), Address::ZERO);
        }
        // the selectors can be claimed again
        reg.add_implementation(master(), master(), Address::from_label("n"), sigs).unwrap();
    }

    proptest! {
        #[test]
        fn prop_selector_routes_are_unique(batches in prop::collection::vec(prop::collection::vec(0u8..12, 1..4), 1..8)) {
            let mut reg = ImplementationsRegistry::new();
            for (i, batch) in batches.iter().enumerate() {
                let module = Address([i as u8 + 1; 20]);
                let sigs: Vec<Selector> = batch.iter().map(|b| Selector([*b, 0, 0, 0])).collect();
                let before: Vec<Address> = (0u8..12).map(|b| reg.get_sig_implementation(&Selector([b, 0, 0, 0]))).collect();
                if reg.add_implementation(master(), master(), module, sigs.clone()).is_err() {
                    let after: Vec<Address> = (0u8..12).map(|b| reg.get_sig_implementation(&Selector([b, 0, 0, 0]))).collect();
                    prop_assert_eq!(before, after);
                }
            }
            // every routed selector is listed by exactly one module
            for b in 0u8..12 {
                let s = Selector([b, 0, 0, 0]);
                let owner = reg.get_sig_implementation(&s);
                if !owner.is_zero() {
                    prop_assert!(reg.get_implementation_sigs(&owner).contains(&s));
                }
            }
        }
    }
}
