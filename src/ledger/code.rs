//! Code attached to ledger addresses.
//!
//! Modules never own state: they run against an [`Env`] whose `this` is the
//! account being served, so one deployed module serves every account.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::account::{AccountCall, CastImplementation, DefaultImplementation, FlashLoanHook, MinBalanceCheck, Output};
use crate::connectors::{AuthConnector, BasicConnector, BetaConnector, ConnectorOutput, EmitEventConnector, SpellData};
use crate::error::{LayerError, Result};
use crate::ledger::Env;
use crate::types::{Address, Selector};

/// Logic behind an account's selectors.
pub trait Implementation: Send + Sync {
    fn name(&self) -> &str;

    /// Signatures this module answers when registered with explicit routes.
    fn signatures(&self) -> Vec<&'static str>;

    fn selectors(&self) -> Vec<Selector> {
        self.signatures()
            .into_iter()
            .map(Selector::from_signature)
            .collect()
    }

    fn execute(&self, env: &mut Env<'_>, call: &AccountCall) -> Result<Output>;
}

/// A named plugin invoked by spells.
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, env: &mut Env<'_>, spell: &SpellData) -> Result<ConnectorOutput>;
}

/// Post-cast validation bound to an account version.
pub trait CheckModule: Send + Sync {
    fn is_ok(&self, env: &Env<'_>) -> bool;
}

/// Wraps a whole spell batch.
pub trait CastHook: Send + Sync {
    fn before(&self, env: &mut Env<'_>) -> Result<()>;
    fn after(&self, env: &mut Env<'_>) -> Result<()>;
}

#[derive(Clone)]
pub enum Code {
    Implementation(Arc<dyn Implementation>),
    Connector(Arc<dyn Connector>),
    Check(Arc<dyn CheckModule>),
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Implementation(i) => write!(f, "Implementation({})", i.name()),
            Code::Connector(c) => write!(f, "Connector({})", c.name()),
            Code::Check(_) => f.write_str("Check"),
        }
    }
}

/// Built-in code recorded in the persisted state, so a reloaded ledger can
/// reattach it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum BuiltinCode {
    DefaultImplementation,
    CastM1,
    CastM2 { pool: Address, amount: u128 },
    CastBeta,
    MinBalanceCheck { floor: u128 },
    AuthConnector,
    EmitEventConnector,
    BetaConnector,
    BasicConnector,
}

impl BuiltinCode {
    pub fn instantiate(&self) -> Code {
        match self {
            BuiltinCode::DefaultImplementation => Code::Implementation(Arc::new(DefaultImplementation)),
            BuiltinCode::CastM1 => Code::Implementation(Arc::new(CastImplementation::m1())),
            BuiltinCode::CastM2 { pool, amount } => Code::Implementation(Arc::new(
                CastImplementation::m2(Arc::new(FlashLoanHook::new(*pool, *amount))),
            )),
            BuiltinCode::CastBeta => Code::Implementation(Arc::new(CastImplementation::beta())),
            BuiltinCode::MinBalanceCheck { floor } => Code::Check(Arc::new(MinBalanceCheck::new(*floor))),
            BuiltinCode::AuthConnector => Code::Connector(Arc::new(AuthConnector)),
            BuiltinCode::EmitEventConnector => Code::Connector(Arc::new(EmitEventConnector)),
            BuiltinCode::BetaConnector => Code::Connector(Arc::new(BetaConnector)),
            BuiltinCode::BasicConnector => Code::Connector(Arc::new(BasicConnector)),
        }
    }

    /// Reference connector for a configured name.
    pub fn connector_named(name: &str) -> Option<Self> {
        match name {
            "auth" => Some(BuiltinCode::AuthConnector),
            "emitEvent" => Some(BuiltinCode::EmitEventConnector),
            "betaV2" => Some(BuiltinCode::BetaConnector),
            "basic" => Some(BuiltinCode::BasicConnector),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CodeBook {
    code: BTreeMap<Address, Code>,
}

impl CodeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address, code: Code) {
        self.code.insert(address, code);
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.code.contains_key(address)
    }

    pub fn implementation(&self, address: &Address) -> Result<Arc<dyn Implementation>> {
        match self.code.get(address) {
            Some(Code::Implementation(i)) => Ok(Arc::clone(i)),
            _ => Err(LayerError::NoCode(*address)),
        }
    }

    pub fn connector(&self, address: &Address) -> Result<Arc<dyn Connector>> {
        match self.code.get(address) {
            Some(Code::Connector(c)) => Ok(Arc::clone(c)),
            _ => Err(LayerError::NoCode(*address)),
        }
    }

    pub fn check(&self, address: &Address) -> Result<Arc<dyn CheckModule>> {
        match self.code.get(address) {
            Some(Code::Check(c)) => Ok(Arc::clone(c)),
            _ => Err(LayerError::NoCode(*address)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codebook_kinds_do_not_mix() {
        let mut book = CodeBook::new();
        let addr = Address::from_label("auth");
        book.insert(addr, BuiltinCode::AuthConnector.instantiate());
        assert!(book.connector(&addr).is_ok());
        assert_eq!(book.implementation(&addr).err(), Some(LayerError::NoCode(addr)));
        assert!(book.check(&Address::ZERO).is_err());
    }

    #[test]
    fn test_connector_names() {
        assert_eq!(BuiltinCode::connector_named("auth"), Some(BuiltinCode::AuthConnector));
        assert_eq!(BuiltinCode::connector_named("Auth"), None);
    }
}
