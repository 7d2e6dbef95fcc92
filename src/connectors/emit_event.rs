use crate::encoding::Token;
use crate::error::Result;
use crate::ledger::{Connector, Env};

use super::{log, unknown_method, ConnectorOutput, SpellData};

/// Emits `LogEmitEvent(account, sender)` and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmitEventConnector;

impl Connector for EmitEventConnector {
    fn name(&self) -> &str {
        "emitEvent"
    }

    fn execute(&self, env: &mut Env<'_>, spell: &SpellData) -> Result<ConnectorOutput> {
        if spell.method != "emitEvent" {
            return Err(unknown_method(self.name(), spell));
        }
        let params = vec![Token::Address(env.this()), Token::Address(env.sender())];
        Ok(log(env, "LogEmitEvent", params))
    }
}
