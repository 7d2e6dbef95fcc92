//! In-process ledger hosting the registries, account proxies and module code.
//!
//! Every public mutating entry point is one transaction: the state is cloned
//! up front and restored on error, so a failed call leaves no trace (logs
//! included).

mod code;
mod env;
mod guard;
mod state;

pub use code::{BuiltinCode, CastHook, CheckModule, Code, CodeBook, Connector, Implementation};
pub use env::Env;
pub use guard::{GuardKey, ReentrancyGuard};
pub use state::LedgerState;

use std::ops::Range;
use tracing::{debug, info};

use crate::account::{AccountCall, AccountState, CallInput, Output};
use crate::error::{LayerError, Result};
use crate::events::{Event, LogRecord};
use crate::registry::{ConnectorsRegistry, ImplementationsRegistry, IndexRegistry, ListRegistry};
use crate::types::{AccountId, Address, Selector};

struct Checkpoint {
    state: LedgerState,
    logs: usize,
}

pub struct Ledger {
    state: LedgerState,
    code: CodeBook,
    guard: ReentrancyGuard,
    last_tx: Range<usize>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::from_state(LedgerState::default())
    }

    /// Rebuild a ledger from a persisted state, reattaching built-in code.
    pub fn from_state(state: LedgerState) -> Self {
        let mut code = CodeBook::new();
        for (address, builtin) in &state.builtins {
            code.insert(*address, builtin.instantiate());
        }
        let end = state.logs.len();
        Self {
            state,
            code,
            guard: ReentrancyGuard::default(),
            last_tx: end..end,
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Copy of everything but the logs, which are only ever appended and so
    /// roll back by truncation.
    fn checkpoint(&mut self) -> Checkpoint {
        let logs = std::mem::take(&mut self.state.logs);
        let state = self.state.clone();
        self.state.logs = logs;
        Checkpoint { state, logs: self.state.logs.len() }
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        let mut logs = std::mem::take(&mut self.state.logs);
        logs.truncate(checkpoint.logs);
        self.state = checkpoint.state;
        self.state.logs = logs;
    }

    fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.checkpoint();
        let start = checkpoint.logs;
        match f(self) {
            Ok(value) => {
                self.last_tx = start..self.state.logs.len();
                Ok(value)
            }
            Err(err) => {
                debug!(%err, "transaction reverted");
                self.revert_to(checkpoint);
                self.guard.clear();
                Err(err)
            }
        }
    }

    /// Sub-transaction for a call made from inside running code. A failure
    /// undoes only the inner call; guards held by the caller stay held.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.checkpoint();
        let result = f(self);
        if let Err(err) = &result {
            debug!(%err, "nested call reverted");
            self.revert_to(checkpoint);
        }
        result
    }

    fn guarded<T>(&mut self, key: GuardKey, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.guard.enter(key)?;
        let result = f(self);
        self.guard.exit(key);
        result
    }

    fn emit(&mut self, emitter: Address, event: Event) {
        debug!(%emitter, event = event.name(), "log");
        self.state.logs.push(LogRecord { emitter, event });
    }

    fn next_address(&mut self, creator: Address) -> Address {
        self.state.nonce += 1;
        Address::derive(&creator, self.state.nonce)
    }

    // ---- native value ----

    /// Credit `amount` out of thin air; used for genesis balances and tests.
    pub fn fund(&mut self, address: Address, amount: u128) {
        let balance = self.state.balances.entry(address).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, address: &Address) -> u128 {
        self.state.balance(address)
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.state.balance(&from);
        if available < amount {
            return Err(LayerError::InsufficientBalance);
        }
        self.state.balances.insert(from, available - amount);
        let credited = self.state.balance(&to).saturating_add(amount);
        self.state.balances.insert(to, credited);
        Ok(())
    }

    // ---- deployment ----

    pub fn deploy_index(&mut self, deployer: Address) -> Result<Address> {
        if !self.state.index_address.is_zero() {
            return Err(LayerError::AlreadyDefined);
        }
        let address = self.next_address(deployer);
        self.state.index_address = address;
        self.state.index = IndexRegistry::new();
        info!(%address, "index deployed");
        Ok(address)
    }

    pub fn deploy_list(&mut self, deployer: Address) -> Result<Address> {
        if !self.state.list_address.is_zero() {
            return Err(LayerError::AlreadyDefined);
        }
        let address = self.next_address(deployer);
        self.state.list_address = address;
        self.state.list = ListRegistry::new();
        info!(%address, "list deployed");
        Ok(address)
    }

    pub fn deploy_implementations(&mut self, deployer: Address) -> Address {
        let address = self.next_address(deployer);
        self.state.implementations.insert(address, ImplementationsRegistry::new());
        info!(%address, "implementations registry deployed");
        address
    }

    pub fn deploy_connectors(&mut self, deployer: Address) -> Address {
        let address = self.next_address(deployer);
        self.state.connectors.insert(address, ConnectorsRegistry::new());
        info!(%address, "connectors registry deployed");
        address
    }

    /// Proxy template whose clones route through `implementations`.
    pub fn deploy_account_template(&mut self, deployer: Address, implementations: Address) -> Result<Address> {
        if !self.state.implementations.contains_key(&implementations) {
            return Err(LayerError::NoCode(implementations));
        }
        let address = self.next_address(deployer);
        self.state.templates.insert(address, implementations);
        info!(%address, %implementations, "account template deployed");
        Ok(address)
    }

    /// Attach arbitrary code. It is not persisted with the state.
    pub fn deploy_code(&mut self, deployer: Address, code: Code) -> Address {
        let address = self.next_address(deployer);
        debug!(%address, ?code, "code deployed");
        self.code.insert(address, code);
        address
    }

    pub fn deploy_builtin(&mut self, deployer: Address, builtin: BuiltinCode) -> Address {
        let address = self.deploy_code(deployer, builtin.instantiate());
        self.state.builtins.insert(address, builtin);
        address
    }

    // ---- index ----

    fn index_address(&self) -> Result<Address> {
        let address = self.state.index_address;
        if address.is_zero() {
            return Err(LayerError::NoCode(address));
        }
        Ok(address)
    }

    pub fn set_basics(
        &mut self,
        sender: Address,
        master: Address,
        list: Address,
        account: Address,
        connectors: Address,
    ) -> Result<()> {
        let index = self.index_address()?;
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(index), |ledger| {
                let event = ledger.state.index.set_basics(master, list, account, connectors)?;
                if list != ledger.state.list_address || !ledger.state.templates.contains_key(&account) {
                    return Err(LayerError::NotValidAddress);
                }
                ledger.emit(index, event);
                info!(%sender, %master, "index basics set");
                Ok(())
            })
        })
    }

    pub fn change_master(&mut self, sender: Address, new_master: Address) -> Result<()> {
        let index = self.index_address()?;
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(index), |ledger| {
                let event = ledger.state.index.change_master(sender, new_master)?;
                ledger.emit(index, event);
                info!(%new_master, "master nominated");
                Ok(())
            })
        })
    }

    pub fn update_master(&mut self, sender: Address) -> Result<()> {
        let index = self.index_address()?;
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(index), |ledger| {
                let event = ledger.state.index.update_master(sender)?;
                ledger.emit(index, event);
                info!(master = %sender, "master handover finalized");
                Ok(())
            })
        })
    }

    /// Register a new account version. Returns its number.
    pub fn add_new_account(
        &mut self,
        sender: Address,
        account: Address,
        connectors: Address,
        check: Address,
    ) -> Result<u64> {
        let index = self.index_address()?;
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(index), |ledger| {
                let event = ledger.state.index.add_new_account(sender, account, connectors, check)?;
                if !ledger.state.templates.contains_key(&account) {
                    return Err(LayerError::NotValidAddress);
                }
                ledger.emit(index, event);
                let version = ledger.state.index.version_count();
                info!(version, %account, %connectors, %check, "account version registered");
                Ok(version)
            })
        })
    }

    pub fn change_check(&mut self, sender: Address, version: u64, check: Address) -> Result<()> {
        let index = self.index_address()?;
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(index), |ledger| {
                let event = ledger.state.index.change_check(sender, version, check)?;
                ledger.emit(index, event);
                info!(version, %check, "check module changed");
                Ok(())
            })
        })
    }

    /// Clone the version's proxy template for `owner`.
    pub fn build(&mut self, sender: Address, owner: Address, version: u64, origin: Address) -> Result<Address> {
        let index = self.index_address()?;
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(index), |ledger| {
                let info = ledger.state.index.version_for_build(version)?;
                if !ledger.state.templates.contains_key(&info.account) {
                    return Err(LayerError::NotValidAccount);
                }
                let account = ledger.next_address(index);
                ledger
                    .state
                    .accounts
                    .insert(account, AccountState::new(info.account, version));
                ledger.state.index.record_clone(version, account);
                ledger.list_init(index, account)?;
                ledger.dispatch(index, account, 0, CallInput::Invoke(AccountCall::Enable(owner)))?;
                ledger.emit(
                    index,
                    Event::LogAccountCreated { sender, owner, account, origin },
                );
                info!(%account, %owner, version, "account built");
                Ok(account)
            })
        })
    }

    // ---- list ----

    fn list_init(&mut self, sender: Address, account: Address) -> Result<AccountId> {
        let list = self.state.list_address;
        self.guarded(GuardKey::Registry(list), |ledger| {
            if sender != ledger.state.index_address {
                return Err(LayerError::NotIndex);
            }
            ledger.state.list.init(account)
        })
    }

    /// Id of `account` if it is a genuine clone known to the list.
    fn genuine_account(&self, account: &Address) -> Result<AccountId> {
        let id = self.state.list.account_id(account);
        let version = self.state.accounts.get(account).map(|a| a.version).unwrap_or(0);
        if id == 0 || !self.state.index.is_clone(version, account) {
            return Err(LayerError::NotAccount);
        }
        Ok(id)
    }

    fn account_lists_auth(&self, account: &Address, owner: &Address) -> bool {
        self.state
            .accounts
            .get(account)
            .map(|a| a.storage.auth.contains(owner))
            .unwrap_or(false)
    }

    fn list_add_auth(&mut self, sender: Address, owner: Address) -> Result<()> {
        let list = self.state.list_address;
        self.guarded(GuardKey::Registry(list), |ledger| {
            let id = ledger.genuine_account(&sender)?;
            if !ledger.account_lists_auth(&sender, &owner) {
                return Err(LayerError::NotOwner);
            }
            ledger.state.list.add_auth(id, owner)
        })
    }

    fn list_remove_auth(&mut self, sender: Address, owner: Address) -> Result<()> {
        let list = self.state.list_address;
        self.guarded(GuardKey::Registry(list), |ledger| {
            let id = ledger.genuine_account(&sender)?;
            if ledger.account_lists_auth(&sender, &owner) {
                return Err(LayerError::AlreadyOwner);
            }
            ledger.state.list.remove_auth(id, owner)
        })
    }

    // ---- implementations ----

    fn implementations_mut(&mut self, registry: Address) -> Result<&mut ImplementationsRegistry> {
        self.state
            .implementations
            .get_mut(&registry)
            .ok_or(LayerError::NoCode(registry))
    }

    pub fn set_default_implementation(
        &mut self,
        sender: Address,
        registry: Address,
        implementation: Address,
    ) -> Result<()> {
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(registry), |ledger| {
                let master = ledger.state.index.master();
                let event = ledger
                    .implementations_mut(registry)?
                    .set_default_implementation(sender, master, implementation)?;
                ledger.emit(registry, event);
                info!(%registry, %implementation, "default implementation set");
                Ok(())
            })
        })
    }

    pub fn add_implementation(
        &mut self,
        sender: Address,
        registry: Address,
        implementation: Address,
        sigs: Vec<Selector>,
    ) -> Result<()> {
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(registry), |ledger| {
                let master = ledger.state.index.master();
                let count = sigs.len();
                let event = ledger
                    .implementations_mut(registry)?
                    .add_implementation(sender, master, implementation, sigs)?;
                ledger.emit(registry, event);
                info!(%registry, %implementation, sigs = count, "implementation added");
                Ok(())
            })
        })
    }

    pub fn remove_implementation(
        &mut self,
        sender: Address,
        registry: Address,
        implementation: Address,
    ) -> Result<()> {
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(registry), |ledger| {
                let master = ledger.state.index.master();
                let event = ledger
                    .implementations_mut(registry)?
                    .remove_implementation(sender, master, implementation)?;
                ledger.emit(registry, event);
                info!(%registry, %implementation, "implementation removed");
                Ok(())
            })
        })
    }

    // ---- connectors ----

    fn connectors_mut(&mut self, registry: Address) -> Result<&mut ConnectorsRegistry> {
        self.state
            .connectors
            .get_mut(&registry)
            .ok_or(LayerError::NoCode(registry))
    }

    pub fn toggle_chief(&mut self, sender: Address, registry: Address, chief: Address) -> Result<()> {
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(registry), |ledger| {
                let master = ledger.state.index.master();
                let event = ledger.connectors_mut(registry)?.toggle_chief(sender, master, chief)?;
                ledger.emit(registry, event);
                Ok(())
            })
        })
    }

    pub fn add_connectors(
        &mut self,
        sender: Address,
        registry: Address,
        names: &[String],
        connectors: &[Address],
    ) -> Result<()> {
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(registry), |ledger| {
                let master = ledger.state.index.master();
                let events = ledger
                    .connectors_mut(registry)?
                    .add_connectors(sender, master, names, connectors)?;
                for event in events {
                    ledger.emit(registry, event);
                }
                info!(%registry, ?names, "connectors added");
                Ok(())
            })
        })
    }

    pub fn update_connectors(
        &mut self,
        sender: Address,
        registry: Address,
        names: &[String],
        connectors: &[Address],
    ) -> Result<()> {
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(registry), |ledger| {
                let master = ledger.state.index.master();
                let events = ledger
                    .connectors_mut(registry)?
                    .update_connectors(sender, master, names, connectors)?;
                for event in events {
                    ledger.emit(registry, event);
                }
                info!(%registry, ?names, "connectors updated");
                Ok(())
            })
        })
    }

    pub fn remove_connectors(&mut self, sender: Address, registry: Address, names: &[String]) -> Result<()> {
        self.transact(|ledger| {
            ledger.guarded(GuardKey::Registry(registry), |ledger| {
                let master = ledger.state.index.master();
                let events = ledger
                    .connectors_mut(registry)?
                    .remove_connectors(sender, master, names)?;
                for event in events {
                    ledger.emit(registry, event);
                }
                info!(%registry, ?names, "connectors removed");
                Ok(())
            })
        })
    }

    // ---- account proxy ----

    /// Send `input` with `value` from `sender` to the account at `to`.
    pub fn call(&mut self, sender: Address, to: Address, value: u128, input: CallInput) -> Result<Output> {
        self.transact(|ledger| ledger.dispatch(sender, to, value, input))
    }

    pub fn invoke(&mut self, sender: Address, to: Address, call: AccountCall) -> Result<Output> {
        self.call(sender, to, 0, CallInput::Invoke(call))
    }

    pub fn deposit(&mut self, sender: Address, to: Address, value: u128) -> Result<()> {
        self.call(sender, to, value, CallInput::Empty).map(|_| ())
    }

    /// Proxy fallback: credit the value, then forward to whatever the
    /// account's implementations registry routes the selector to.
    fn dispatch(&mut self, sender: Address, to: Address, value: u128, input: CallInput) -> Result<Output> {
        let template = self
            .state
            .accounts
            .get(&to)
            .map(|a| a.template)
            .ok_or(LayerError::NoCode(to))?;
        self.move_balance(sender, to, value)?;

        let call = match input {
            CallInput::Empty => {
                debug!(account = %to, %sender, value, "deposit");
                return Ok(Output::None);
            }
            CallInput::Invoke(call) => call,
        };

        let selector = call.selector();
        let implementation = self
            .state
            .templates
            .get(&template)
            .and_then(|registry| self.state.implementations.get(registry))
            .map(|registry| registry.get_implementation(&selector))
            .unwrap_or_default();
        if implementation.is_zero() {
            return Err(LayerError::NoImplementation);
        }
        let code = self.code.implementation(&implementation)?;
        debug!(account = %to, %sender, signature = call.signature(), module = code.name(), "dispatch");
        let mut env = Env::new(self, to, sender, value);
        code.execute(&mut env, &call)
    }

    // ---- reads ----

    pub fn index(&self) -> &IndexRegistry {
        &self.state.index
    }

    pub fn index_addr(&self) -> Address {
        self.state.index_address
    }

    pub fn list(&self) -> &ListRegistry {
        &self.state.list
    }

    pub fn list_addr(&self) -> Address {
        self.state.list_address
    }

    pub fn implementations(&self, registry: &Address) -> Option<&ImplementationsRegistry> {
        self.state.implementations.get(registry)
    }

    pub fn connectors(&self, registry: &Address) -> Option<&ConnectorsRegistry> {
        self.state.connectors.get(registry)
    }

    pub fn account(&self, address: &Address) -> Option<&AccountState> {
        self.state.accounts.get(address)
    }

    pub fn is_auth(&self, account: &Address, user: &Address) -> bool {
        self.account_lists_auth(account, user)
    }

    pub fn has_code(&self, address: &Address) -> bool {
        self.code.contains(address)
    }

    pub fn logs(&self) -> &[LogRecord] {
        &self.state.logs
    }

    /// Logs of the last transaction that committed.
    pub fn last_logs(&self) -> &[LogRecord] {
        &self.state.logs[self.last_tx.clone()]
    }
}
