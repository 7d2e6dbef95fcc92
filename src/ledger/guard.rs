use std::collections::BTreeSet;

use crate::error::{LayerError, Result};
use crate::types::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GuardKey {
    /// A spell batch running on this account.
    Cast(Address),
    /// A mutation in progress on this registry.
    Registry(Address),
}

/// Set of sections currently entered. Entering a held section fails.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    held: BTreeSet<GuardKey>,
}

impl ReentrancyGuard {
    pub fn enter(&mut self, key: GuardKey) -> Result<()> {
        if !self.held.insert(key) {
            tracing::warn!(?key, "reentrant call rejected");
            return Err(LayerError::ReentrantCall);
        }
        Ok(())
    }

    pub fn exit(&mut self, key: GuardKey) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: &GuardKey) -> bool {
        self.held.contains(key)
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}
