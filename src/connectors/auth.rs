use crate::account::AccountCall;
use crate::encoding::Token;
use crate::error::{LayerError, Result};
use crate::ledger::{Connector, Env};

use super::{log, unknown_method, ConnectorOutput, SpellData};

/// Adds or removes auths through the account's own `enable`/`disable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthConnector;

impl Connector for AuthConnector {
    fn name(&self) -> &str {
        "auth"
    }

    fn execute(&self, env: &mut Env<'_>, spell: &SpellData) -> Result<ConnectorOutput> {
        let this = env.this();
        match spell.method.as_str() {
            "add" => {
                let authority = spell.address(0)?;
                env.call(this, 0, AccountCall::Enable(authority))?;
                let sender = env.sender();
                Ok(log(env, "LogAddAuth", vec![Token::Address(sender), Token::Address(authority)]))
            }
            "remove" => {
                let authority = spell.address(0)?;
                if env.auth_count() <= 1 {
                    return Err(LayerError::RemovingAllAuthorities);
                }
                env.call(this, 0, AccountCall::Disable(authority))?;
                let sender = env.sender();
                Ok(log(env, "LogRemoveAuth", vec![Token::Address(sender), Token::Address(authority)]))
            }
            _ => Err(unknown_method(self.name(), spell)),
        }
    }
}
