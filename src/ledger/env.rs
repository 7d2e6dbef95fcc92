//! Execution context handed to implementation modules, connectors and hooks.

use crate::account::{AccountCall, AccountState, AccountStorage, CallInput, Output};
use crate::connectors::{ConnectorOutput, SpellData};
use crate::error::{LayerError, Result};
use crate::events::Event;
use crate::ledger::{GuardKey, Ledger};
use crate::registry::IndexRegistry;
use crate::types::Address;

/// A running call: `this` is the account whose storage is in scope, `sender`
/// the caller as seen by the account.
pub struct Env<'a> {
    ledger: &'a mut Ledger,
    this: Address,
    sender: Address,
    value: u128,
}

impl<'a> Env<'a> {
    pub(crate) fn new(ledger: &'a mut Ledger, this: Address, sender: Address, value: u128) -> Self {
        Self { ledger, this, sender, value }
    }

    pub fn this(&self) -> Address {
        self.this
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn index_address(&self) -> Address {
        self.ledger.state.index_address
    }

    pub fn index(&self) -> &IndexRegistry {
        &self.ledger.state.index
    }

    pub fn account(&self) -> Result<&AccountState> {
        self.ledger
            .state
            .accounts
            .get(&self.this)
            .ok_or(LayerError::NotAnAccount(self.this))
    }

    pub fn storage(&self) -> Result<&AccountStorage> {
        self.account().map(|a| &a.storage)
    }

    pub fn storage_mut(&mut self) -> Result<&mut AccountStorage> {
        let this = self.this;
        self.ledger
            .state
            .accounts
            .get_mut(&this)
            .map(|a| &mut a.storage)
            .ok_or(LayerError::NotAnAccount(this))
    }

    pub fn balance(&self, address: &Address) -> u128 {
        self.ledger.state.balance(address)
    }

    /// Number of auths the list registry holds for this account.
    pub fn auth_count(&self) -> u64 {
        let list = &self.ledger.state.list;
        list.account_link(list.account_id(&self.this)).count
    }

    /// Record an event with this account as emitter.
    pub fn emit(&mut self, event: Event) {
        self.ledger.emit(self.this, event);
    }

    /// Outbound call made by this account. If it fails, none of its effects
    /// survive, even when the caller carries on.
    pub fn call(&mut self, to: Address, value: u128, call: AccountCall) -> Result<Output> {
        let this = self.this;
        self.ledger
            .nested(|ledger| ledger.dispatch(this, to, value, CallInput::Invoke(call)))
    }

    /// Move native value out of this account.
    pub fn transfer(&mut self, to: Address, amount: u128) -> Result<()> {
        self.ledger.move_balance(self.this, to, amount)
    }

    pub(crate) fn move_balance(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        self.ledger.move_balance(from, to, amount)
    }

    pub(crate) fn list_add_auth(&mut self, owner: Address) -> Result<()> {
        self.ledger.list_add_auth(self.this, owner)
    }

    pub(crate) fn list_remove_auth(&mut self, owner: Address) -> Result<()> {
        self.ledger.list_remove_auth(self.this, owner)
    }

    /// `(all bound, addresses)` against the connectors registry of this
    /// account's version. A version without a registry resolves nothing.
    pub fn resolve_connectors(&self, names: &[String]) -> Result<(bool, Vec<Address>)> {
        let version = self.account()?.version;
        let registry = self.ledger.state.index.connectors(version);
        match self.ledger.state.connectors.get(&registry) {
            Some(connectors) => Ok(connectors.is_connectors(names)),
            None => Ok((false, vec![Address::ZERO; names.len()])),
        }
    }

    /// Run connector code against this account, keeping sender and value.
    pub fn run_connector(&mut self, connector: Address, spell: &SpellData) -> Result<ConnectorOutput> {
        let code = self.ledger.code.connector(&connector)?;
        let mut env = Env::new(&mut *self.ledger, self.this, self.sender, self.value);
        code.execute(&mut env, spell)
    }

    pub fn run_check(&self, check: Address) -> Result<bool> {
        let code = self.ledger.code.check(&check)?;
        Ok(code.is_ok(self))
    }

    /// Run `f` holding `key`; the key is released whatever `f` returns.
    pub fn guarded<T>(&mut self, key: GuardKey, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.ledger.guard.enter(key)?;
        let result = f(self);
        self.ledger.guard.exit(key);
        result
    }
}
