use crate::error::Result;
use crate::ledger::{Connector, Env};

use super::{log, unknown_method, ConnectorOutput, SpellData};

/// Switches the account's beta flag from inside a cast.
#[derive(Debug, Default, Clone, Copy)]
pub struct BetaConnector;

impl Connector for BetaConnector {
    fn name(&self) -> &str {
        "betaV2"
    }

    fn execute(&self, env: &mut Env<'_>, spell: &SpellData) -> Result<ConnectorOutput> {
        let (beta, event) = match spell.method.as_str() {
            "enable" => (true, "LogEnableBeta"),
            "disable" => (false, "LogDisableBeta"),
            _ => return Err(unknown_method(self.name(), spell)),
        };
        env.storage_mut()?.beta = beta;
        Ok(log(env, event, vec![]))
    }
}
