//! Reference connectors and the spell payload format.
//!
//! Connectors are plumbing only: they reach the account's own surface (auth
//! set, beta flag, native balance) and report what they did as an ABI event.

mod auth;
mod basic;
mod beta;
mod emit_event;

pub use auth::AuthConnector;
pub use basic::BasicConnector;
pub use beta::BetaConnector;
pub use emit_event::EmitEventConnector;

use serde::{Deserialize, Serialize};

use crate::encoding::{self, Token};
use crate::error::{LayerError, Result};
use crate::events::Event;
use crate::ledger::Env;
use crate::types::Address;

/// One spell's payload: the connector method and its arguments.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SpellData {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Token>,
}

pub fn spell(method: &str, args: Vec<Token>) -> SpellData {
    SpellData {
        method: method.to_string(),
        args,
    }
}

impl SpellData {
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    fn arg(&self, i: usize) -> Result<&Token> {
        self.args
            .get(i)
            .ok_or_else(|| LayerError::Connector(format!("{}: missing argument {}", self.method, i)))
    }

    pub fn address(&self, i: usize) -> Result<Address> {
        self.arg(i)?
            .as_address()
            .ok_or_else(|| LayerError::Connector(format!("{}: argument {} is not an address", self.method, i)))
    }

    pub fn uint(&self, i: usize) -> Result<u128> {
        self.arg(i)?
            .as_uint()
            .ok_or_else(|| LayerError::Connector(format!("{}: argument {} is not a uint", self.method, i)))
    }
}

/// What a connector reports back to the engine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConnectorOutput {
    pub event_name: String,
    pub event_params: Vec<u8>,
}

/// Emit `name(params)` from the account and return it for mirroring.
pub fn log(env: &mut Env<'_>, name: &str, params: Vec<Token>) -> ConnectorOutput {
    let signature = encoding::event_signature(name, &params);
    let encoded = encoding::encode(&params);
    env.emit(Event::Connector {
        signature: signature.clone(),
        params: encoded.clone(),
    });
    ConnectorOutput {
        event_name: signature,
        event_params: encoded,
    }
}

fn unknown_method(connector: &str, spell: &SpellData) -> LayerError {
    LayerError::Connector(format!("{}: unknown method {}", connector, spell.method))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spell_payload_decodes() {
        let data = br#"{"method":"add","args":[{"type":"address","value":"0x0000000000000000000000000000000000000001"}]}"#;
        let decoded = SpellData::decode(data).unwrap();
        assert_eq!(decoded.method, "add");
        let mut one = [0u8; 20];
        one[19] = 1;
        assert_eq!(decoded.address(0).unwrap(), Address(one));
        assert!(decoded.uint(0).is_err());
        assert!(decoded.address(1).is_err());
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        assert!(matches!(SpellData::decode(b"\x00\x01"), Err(LayerError::Serialization(_))));
        let empty_args = SpellData::decode(br#"{"method":"emitEvent"}"#).unwrap();
        assert!(empty_args.args.is_empty());
    }
}
