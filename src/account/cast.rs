//! Spell execution engine.
//!
//! A batch is validated as a whole (caller, shape, connector names) before the
//! first spell runs; spells then run strictly in order against the account's
//! own storage, and one `LogCast` mirrors what each of them reported.

use std::sync::Arc;
use tracing::debug;

use crate::account::types::{AccountCall, CastArgs, CastReceipt, Output};
use crate::connectors::SpellData;
use crate::error::{LayerError, Result};
use crate::events::Event;
use crate::ledger::{CastHook, CheckModule, Env, GuardKey, Implementation};
use crate::types::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastVariant {
    /// `cast`
    M1,
    /// `castWithFlashloan`, wrapped in a hook
    M2,
    /// `castBeta`, only for accounts in beta mode
    Beta,
}

impl CastVariant {
    /// Prefix of this variant's revert reasons.
    pub fn prefix(self) -> &'static str {
        match self {
            CastVariant::M1 => "1",
            CastVariant::M2 => "2",
            CastVariant::Beta => "beta",
        }
    }

    pub fn signature(self) -> &'static str {
        match self {
            CastVariant::M1 => "cast(string[],bytes[],address)",
            CastVariant::M2 => "castWithFlashloan(string[],bytes[],address)",
            CastVariant::Beta => "castBeta(string[],bytes[],address)",
        }
    }

    /// Every selector the variant answers: its cast entry point plus, for
    /// m1 and m2, the read of the connectors registry it resolves against.
    pub fn signatures(self) -> Vec<&'static str> {
        match self {
            CastVariant::M1 => vec!["connectorsM1()", self.signature()],
            CastVariant::M2 => vec!["connectorsM2()", self.signature()],
            CastVariant::Beta => vec![self.signature()],
        }
    }
}

pub struct CastImplementation {
    variant: CastVariant,
    hook: Option<Arc<dyn CastHook>>,
}

impl CastImplementation {
    pub fn m1() -> Self {
        Self { variant: CastVariant::M1, hook: None }
    }

    pub fn m2(hook: Arc<dyn CastHook>) -> Self {
        Self { variant: CastVariant::M2, hook: Some(hook) }
    }

    pub fn beta() -> Self {
        Self { variant: CastVariant::Beta, hook: None }
    }

    pub fn variant(&self) -> CastVariant {
        self.variant
    }

    fn args<'c>(&self, call: &'c AccountCall) -> Option<&'c CastArgs> {
        match (self.variant, call) {
            (CastVariant::M1, AccountCall::Cast(args))
            | (CastVariant::M2, AccountCall::CastWithFlashloan(args))
            | (CastVariant::Beta, AccountCall::CastBeta(args)) => Some(args),
            _ => None,
        }
    }

    fn cast(&self, env: &mut Env<'_>, args: &CastArgs) -> Result<Output> {
        let key = GuardKey::Cast(env.this());
        env.guarded(key, |env| self.run(env, args))
    }

    fn run(&self, env: &mut Env<'_>, args: &CastArgs) -> Result<Output> {
        let prefix = self.variant.prefix();
        let sender = env.sender();
        let storage = env.storage()?;
        if !storage.auth.contains(&sender) && sender != env.index_address() {
            return Err(LayerError::PermissionDenied(prefix));
        }
        if self.variant == CastVariant::Beta && !storage.beta {
            return Err(LayerError::BetaNotEnabled);
        }
        let len = args.targets.len();
        if len == 0 {
            return Err(LayerError::LengthInvalid(prefix));
        }
        if len != args.datas.len() {
            return Err(LayerError::ArrayLengthInvalid(prefix));
        }
        let (ok, targets) = env.resolve_connectors(&args.targets)?;
        if !ok {
            return Err(LayerError::NotConnector(prefix));
        }
        let spells = args
            .datas
            .iter()
            .map(|data| SpellData::decode(data))
            .collect::<Result<Vec<_>>>()?;

        if let Some(hook) = &self.hook {
            hook.before(env)?;
        }

        let mut receipt = CastReceipt {
            targets: targets.clone(),
            event_names: Vec::with_capacity(len),
            event_params: Vec::with_capacity(len),
        };
        for ((name, target), spell) in args.targets.iter().zip(&targets).zip(&spells) {
            debug!(account = %env.this(), connector = %name, method = %spell.method, "spell");
            let output = env.run_connector(*target, spell)?;
            receipt.event_names.push(output.event_name);
            receipt.event_params.push(output.event_params);
        }

        if let Some(hook) = &self.hook {
            hook.after(env)?;
        }

        let version = env.account()?.version;
        let check = env.index().check(version);
        if !check.is_zero() && !env.run_check(check)? {
            return Err(LayerError::NotOk);
        }

        env.emit(Event::LogCast {
            origin: args.origin,
            sender,
            value: env.value(),
            targets_names: args.targets.clone(),
            targets: receipt.targets.clone(),
            event_names: receipt.event_names.clone(),
            event_params: receipt.event_params.clone(),
        });
        Ok(Output::Cast(receipt))
    }
}

impl Implementation for CastImplementation {
    fn name(&self) -> &str {
        match self.variant {
            CastVariant::M1 => "ImplementationM1",
            CastVariant::M2 => "ImplementationM2",
            CastVariant::Beta => "ImplementationBetaTest",
        }
    }

    fn signatures(&self) -> Vec<&'static str> {
        self.variant.signatures()
    }

    fn execute(&self, env: &mut Env<'_>, call: &AccountCall) -> Result<Output> {
        match (self.variant, call) {
            (CastVariant::M1, AccountCall::ConnectorsM1) | (CastVariant::M2, AccountCall::ConnectorsM2) => {
                let version = env.account()?.version;
                Ok(Output::Address(env.index().connectors(version)))
            }
            _ => match self.args(call) {
                Some(args) => self.cast(env, args),
                None => Err(LayerError::NoImplementation),
            },
        }
    }
}

/// Lends `amount` from `pool` to the account for the duration of a batch.
#[derive(Debug, Clone, Copy)]
pub struct FlashLoanHook {
    pool: Address,
    amount: u128,
}

impl FlashLoanHook {
    pub fn new(pool: Address, amount: u128) -> Self {
        Self { pool, amount }
    }
}

impl CastHook for FlashLoanHook {
    fn before(&self, env: &mut Env<'_>) -> Result<()> {
        let account = env.this();
        debug!(%account, amount = self.amount, "flash loan out");
        env.move_balance(self.pool, account, self.amount)
    }

    fn after(&self, env: &mut Env<'_>) -> Result<()> {
        let account = env.this();
        env.move_balance(account, self.pool, self.amount)
            .map_err(|_| LayerError::FlashLoanNotRepaid)
    }
}

/// Accepts a batch only if the account keeps at least `floor` native value.
#[derive(Debug, Clone, Copy)]
pub struct MinBalanceCheck {
    floor: u128,
}

impl MinBalanceCheck {
    pub fn new(floor: u128) -> Self {
        Self { floor }
    }
}

impl CheckModule for MinBalanceCheck {
    fn is_ok(&self, env: &Env<'_>) -> bool {
        env.balance(&env.this()) >= self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::CallInput;
    use crate::config::LayerConfig;
    use crate::connectors::{spell, SpellData};
    use crate::deploy::Deployment;
    use crate::encoding::Token;
    use crate::ledger::Ledger;

    fn setup() -> (Ledger, Deployment, Address, Address) {
        let mut ledger = Ledger::new();
        let master = Address::from_label("master");
        let deployment = Deployment::standard(&mut ledger, master, &LayerConfig::default()).unwrap();
        let owner = Address::from_label("owner");
        let account = ledger.build(owner, owner, 1, owner).unwrap();
        (ledger, deployment, owner, account)
    }

    fn cast(targets: &[&str], spells: Vec<SpellData>) -> AccountCall {
        AccountCall::Cast(CastArgs {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            datas: spells.iter().map(SpellData::encode).collect(),
            origin: Address::ZERO,
        })
    }

    #[test]
    fn test_cast_rejects_outsiders_and_bad_shapes() {
        let (mut ledger, _, owner, account) = setup();
        let eve = Address::from_label("eve");
        let emit = spell("emitEvent", vec![]);

        let err = ledger.invoke(eve, account, cast(&["emitEvent"], vec![emit.clone()])).unwrap_err();
        assert_eq!(err.to_string(), "1: permission-denied");

        let err = ledger.invoke(owner, account, cast(&[], vec![])).unwrap_err();
        assert_eq!(err.to_string(), "1: length-invalid");

        let err = ledger
            .invoke(owner, account, cast(&["emitEvent", "emitEvent"], vec![emit.clone()]))
            .unwrap_err();
        assert_eq!(err.to_string(), "1: array-length-invalid");

        let err = ledger
            .invoke(owner, account, cast(&["emitEvent", "compound"], vec![emit.clone(), emit]))
            .unwrap_err();
        assert_eq!(err.to_string(), "1: not-connector");
    }

    #[test]
    fn test_cast_mirrors_connector_events() {
        let (mut ledger, deployment, owner, account) = setup();
        let out = ledger
            .invoke(owner, account, cast(&["emitEvent"], vec![spell("emitEvent", vec![])]))
            .unwrap()
            .into_receipt()
            .unwrap();
        assert_eq!(out.event_names, vec!["LogEmitEvent(address,address)".to_string()]);
        assert_eq!(out.targets, vec![deployment.connector("emitEvent").unwrap()]);

        let logs = ledger.last_logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].event.name(), "LogEmitEvent");
        assert_eq!(logs[0].emitter, account);
        match &logs[1].event {
            Event::LogCast { sender, targets_names, event_names, .. } => {
                assert_eq!(*sender, owner);
                assert_eq!(targets_names, &vec!["emitEvent".to_string()]);
                assert_eq!(event_names, &out.event_names);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_flash_loan_is_lent_and_reclaimed() {
        let (mut ledger, deployment, owner, account) = setup();
        let pool_before = ledger.balance(&deployment.flash_pool);
        let call = AccountCall::CastWithFlashloan(CastArgs {
            targets: vec!["emitEvent".into()],
            datas: vec![spell("emitEvent", vec![]).encode()],
            origin: owner,
        });
        ledger.invoke(owner, account, call).unwrap();
        assert_eq!(ledger.balance(&deployment.flash_pool), pool_before);
        assert_eq!(ledger.balance(&account), 0);

        // spending the loan leaves nothing to repay with
        let call = AccountCall::CastWithFlashloan(CastArgs {
            targets: vec!["basic".into()],
            datas: vec![spell(
                "withdraw",
                vec![Token::Address(owner), Token::Uint(deployment.flash_amount)],
            )
            .encode()],
            origin: owner,
        });
        let err = ledger.invoke(owner, account, call).unwrap_err();
        assert_eq!(err, LayerError::FlashLoanNotRepaid);
        assert_eq!(ledger.balance(&owner), 0);
        assert_eq!(ledger.balance(&deployment.flash_pool), pool_before);
    }

    #[test]
    fn test_connectors_reads_follow_the_account_version() {
        let (mut ledger, deployment, owner, account) = setup();
        assert_eq!(
            ledger.invoke(owner, account, AccountCall::ConnectorsM1),
            Ok(Output::Address(deployment.connectors))
        );
        assert_eq!(
            ledger.invoke(owner, account, AccountCall::ConnectorsM2),
            Ok(Output::Address(deployment.connectors))
        );

        let version = ledger
            .add_new_account(deployment.master, deployment.account_template, Address::ZERO, Address::ZERO)
            .unwrap();
        let bare = ledger.build(owner, owner, version, owner).unwrap();
        assert_eq!(
            ledger.invoke(owner, bare, AccountCall::ConnectorsM1),
            Ok(Output::Address(Address::ZERO))
        );
        assert!(!CastVariant::Beta.signatures().contains(&"connectorsM1()"));
    }

    #[test]
    fn test_beta_cast_requires_beta_mode() {
        let (mut ledger, _, owner, account) = setup();
        let call = || {
            AccountCall::CastBeta(CastArgs {
                targets: vec!["emitEvent".into()],
                datas: vec![spell("emitEvent", vec![]).encode()],
                origin: owner,
            })
        };
        assert_eq!(ledger.invoke(owner, account, call()), Err(LayerError::BetaNotEnabled));
        ledger
            .invoke(owner, account, cast(&["betaV2"], vec![spell("enable", vec![])]))
            .unwrap();
        assert!(ledger.invoke(owner, account, call()).is_ok());
    }

    #[test]
    fn test_check_module_can_veto() {
        let (mut ledger, deployment, owner, account) = setup();
        let master = deployment.master;
        let check = ledger.deploy_builtin(master, crate::ledger::BuiltinCode::MinBalanceCheck { floor: 10 });
        ledger.change_check(master, 1, check).unwrap();

        let emit = || cast(&["emitEvent"], vec![spell("emitEvent", vec![])]);
        assert_eq!(ledger.invoke(owner, account, emit()), Err(LayerError::NotOk));

        ledger.fund(owner, 10);
        ledger.call(owner, account, 10, CallInput::Empty).unwrap();
        assert!(ledger.invoke(owner, account, emit()).is_ok());
    }
}
