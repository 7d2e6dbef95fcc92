use serde::Deserialize;
use tracing::{info, warn};

use crate::account::{AccountCall, CallInput, CastArgs};
use crate::cli::{CastFlavor, Commands};
use crate::config::LayerConfig;
use crate::connectors::{spell, SpellData};
use crate::deploy::Deployment;
use crate::encoding::Token;
use crate::error::{LayerError, Result};
use crate::ledger::Ledger;
use crate::storage::{state_root, Storage};
use crate::types::Address;

const DEPLOYMENT_KEY: &str = "deployment";

/// One spell as written on the command line.
#[derive(Debug, Deserialize)]
pub struct SpellSpec {
    pub connector: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Token>,
}

pub fn parse_spells(json: &str) -> Result<(Vec<String>, Vec<Vec<u8>>)> {
    let specs: Vec<SpellSpec> = serde_json::from_str(json)?;
    Ok(specs
        .into_iter()
        .map(|s| {
            let data = SpellData { method: s.method, args: s.args };
            (s.connector, data.encode())
        })
        .unzip())
}

fn load(storage: &Storage) -> Result<(Ledger, Deployment)> {
    let state = storage
        .load_state()?
        .ok_or_else(|| LayerError::Config("no platform in this database, run `layer init` first".into()))?;
    let deployment = storage
        .get::<Deployment>(DEPLOYMENT_KEY)?
        .ok_or_else(|| LayerError::Config("deployment record missing".into()))?;
    Ok((Ledger::from_state(state), deployment))
}

/// Run one command against the database named in `config`.
pub fn run(command: Commands, config: &LayerConfig) -> Result<()> {
    let storage = Storage::open(&config.storage.db_path)?;

    if let Commands::Init { master } = command {
        if storage.load_state()?.is_some() {
            warn!(path = %config.storage.db_path, "database already initialized");
            return Err(LayerError::AlreadyDefined);
        }
        let mut ledger = Ledger::new();
        let deployment = Deployment::standard(&mut ledger, master, config)?;
        storage.put(DEPLOYMENT_KEY, &deployment)?;
        let root = storage.save_state(ledger.state())?;
        println!("{}", serde_json::to_string_pretty(&deployment)?);
        println!("state root: {}", root);
        return Ok(());
    }

    let (mut ledger, deployment) = load(&storage)?;
    let mutated = match command {
        Commands::Init { .. } => false,
        Commands::Build { owner, version, sender, origin } => {
            let sender = sender.unwrap_or(owner);
            let account = ledger.build(sender, owner, version, origin.unwrap_or(sender))?;
            let id = ledger.list().account_id(&account);
            info!(%account, id, "built");
            println!("account {} (id {})", account, id);
            true
        }
        Commands::Cast { account, sender, spells, value, origin, flavor } => {
            let (targets, datas) = parse_spells(&spells)?;
            let args = CastArgs { targets, datas, origin: origin.unwrap_or(sender) };
            let call = match flavor {
                CastFlavor::M1 => AccountCall::Cast(args),
                CastFlavor::Flashloan => AccountCall::CastWithFlashloan(args),
                CastFlavor::Beta => AccountCall::CastBeta(args),
            };
            ledger.call(sender, account, u128::from(value), CallInput::Invoke(call))?;
            print_logs(ledger.last_logs())?;
            true
        }
        Commands::Enable { account, sender, user } => {
            auth_spell(&mut ledger, account, sender, "add", user)?;
            println!("{} enabled on {}", user, account);
            true
        }
        Commands::Disable { account, sender, user } => {
            auth_spell(&mut ledger, account, sender, "remove", user)?;
            println!("{} disabled on {}", user, account);
            true
        }
        Commands::Status => {
            let index = ledger.index();
            println!("index:        {}", deployment.index);
            println!("deployed at:  {}", deployment.deployed_at);
            println!("master:       {}", index.master());
            if !index.new_master().is_zero() {
                println!("nominee:      {}", index.new_master());
            }
            println!("versions:     {}", index.version_count());
            println!("accounts:     {}", ledger.list().accounts());
            println!("logs:         {}", ledger.logs().len());
            println!("state root:   {}", state_root(ledger.state())?);
            false
        }
        Commands::Links { owner, account } => {
            print_links(&ledger, owner, account)?;
            false
        }
        Commands::Logs { last } => {
            let logs = ledger.logs();
            let skip = last.map(|n| logs.len().saturating_sub(n)).unwrap_or(0);
            print_logs(&logs[skip..])?;
            false
        }
        Commands::Connectors { version } => {
            let registry = ledger.index().connectors(version);
            match ledger.connectors(&registry) {
                Some(connectors) => {
                    for entry in connectors.entries() {
                        println!("{:<16} {}", entry.name, entry.connector);
                    }
                }
                None => println!("version {} has no connectors registry", version),
            }
            false
        }
    };

    if mutated {
        let root = storage.save_state(ledger.state())?;
        info!(%root, "state persisted");
    }
    Ok(())
}

fn auth_spell(ledger: &mut Ledger, account: Address, sender: Address, method: &str, user: Address) -> Result<()> {
    let data = spell(method, vec![Token::Address(user)]).encode();
    let call = AccountCall::Cast(CastArgs {
        targets: vec!["auth".to_string()],
        datas: vec![data],
        origin: sender,
    });
    ledger.invoke(sender, account, call)?;
    Ok(())
}

fn print_links(ledger: &Ledger, owner: Option<Address>, account: Option<Address>) -> Result<()> {
    let list = ledger.list();
    if let Some(owner) = owner {
        let link = list.user_link(&owner);
        println!("owner {} first={} last={} count={}", owner, link.first, link.last, link.count);
        for id in list.accounts_of(&owner) {
            let node = list.user_list(&owner, id);
            println!("  id {} {} prev={} next={}", id, list.account_addr(id), node.prev, node.next);
        }
    }
    if let Some(account) = account {
        let id = list.account_id(&account);
        if id == 0 {
            return Err(LayerError::NotAnAccount(account));
        }
        let link = list.account_link(id);
        println!("account {} (id {}) count={}", account, id, link.count);
        for auth in list.auths_of(id) {
            let node = list.account_list(id, &auth);
            println!("  {} prev={} next={}", auth, node.prev, node.next);
        }
    }
    if owner.is_none() && account.is_none() {
        println!("pass --owner or --account");
    }
    Ok(())
}

fn print_logs(logs: &[crate::events::LogRecord]) -> Result<()> {
    for record in logs {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spells() {
        let json = r#"[
            {"connector": "auth", "method": "add", "args": [{"type": "address", "value": "0x0000000000000000000000000000000000000002"}]},
            {"connector": "emitEvent", "method": "emitEvent"}
        ]"#;
        let (targets, datas) = parse_spells(json).unwrap();
        assert_eq!(targets, vec!["auth".to_string(), "emitEvent".to_string()]);
        assert_eq!(SpellData::decode(&datas[1]).unwrap().method, "emitEvent");
        assert!(parse_spells("{}").is_err());
    }
}
