use crate::encoding::Token;
use crate::error::Result;
use crate::ledger::{Connector, Env};

use super::{log, unknown_method, ConnectorOutput, SpellData};

/// Native value movements out of the account.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicConnector;

impl Connector for BasicConnector {
    fn name(&self) -> &str {
        "basic"
    }

    fn execute(&self, env: &mut Env<'_>, spell: &SpellData) -> Result<ConnectorOutput> {
        match spell.method.as_str() {
            "withdraw" => {
                let to = spell.address(0)?;
                let amount = spell.uint(1)?;
                env.transfer(to, amount)?;
                Ok(log(env, "LogWithdraw", vec![Token::Address(to), Token::Uint(amount)]))
            }
            _ => Err(unknown_method(self.name(), spell)),
        }
    }
}
