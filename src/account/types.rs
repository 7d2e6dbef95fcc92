//! Account call surface and per-account persistent state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::encoding::Token;
use crate::types::{Address, Selector};

/// Receiver acknowledgement values.
pub const ERC721_RECEIVED: Selector = Selector([0x15, 0x0b, 0x7a, 0x02]);
pub const ERC1155_RECEIVED: Selector = Selector([0xf2, 0x3a, 0x6e, 0x61]);
pub const ERC1155_BATCH_RECEIVED: Selector = Selector([0xbc, 0x19, 0x7c, 0x81]);

/// Arguments shared by every cast flavour.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CastArgs {
    pub targets: Vec<String>,
    pub datas: Vec<Vec<u8>>,
    pub origin: Address,
}

/// Decoded call to an account proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountCall {
    Cast(CastArgs),
    CastWithFlashloan(CastArgs),
    CastBeta(CastArgs),
    ConnectorsM1,
    ConnectorsM2,
    Enable(Address),
    Disable(Address),
    IsAuth(Address),
    IsBeta,
    ToggleBeta,
    Version,
    ImplementationVersion,
    LayerIndex,
    OnErc721Received {
        operator: Address,
        from: Address,
        token_id: u128,
        data: Vec<u8>,
    },
    OnErc1155Received {
        operator: Address,
        from: Address,
        id: u128,
        value: u128,
        data: Vec<u8>,
    },
    OnErc1155BatchReceived {
        operator: Address,
        from: Address,
        ids: Vec<u128>,
        values: Vec<u128>,
        data: Vec<u8>,
    },
    /// Any other selector, routed like the rest.
    Custom { signature: String, args: Vec<Token> },
}

impl AccountCall {
    pub fn signature(&self) -> &str {
        match self {
            AccountCall::Cast(_) => "cast(string[],bytes[],address)",
            AccountCall::CastWithFlashloan(_) => "castWithFlashloan(string[],bytes[],address)",
            AccountCall::CastBeta(_) => "castBeta(string[],bytes[],address)",
            AccountCall::ConnectorsM1 => "connectorsM1()",
            AccountCall::ConnectorsM2 => "connectorsM2()",
            AccountCall::Enable(_) => "enable(address)",
            AccountCall::Disable(_) => "disable(address)",
            AccountCall::IsAuth(_) => "isAuth(address)",
            AccountCall::IsBeta => "isBeta()",
            AccountCall::ToggleBeta => "toggleBeta()",
            AccountCall::Version => "version()",
            AccountCall::ImplementationVersion => "implementationVersion()",
            AccountCall::LayerIndex => "layerIndex()",
            AccountCall::OnErc721Received { .. } => "onERC721Received(address,address,uint256,bytes)",
            AccountCall::OnErc1155Received { .. } => {
                "onERC1155Received(address,address,uint256,uint256,bytes)"
            }
            AccountCall::OnErc1155BatchReceived { .. } => {
                "onERC1155BatchReceived(address,address,uint256[],uint256[],bytes)"
            }
            AccountCall::Custom { signature, .. } => signature,
        }
    }

    pub fn selector(&self) -> Selector {
        Selector::from_signature(self.signature())
    }
}

/// Raw input of a proxy call. `Empty` carries no selector and is a deposit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallInput {
    Empty,
    Invoke(AccountCall),
}

impl From<AccountCall> for CallInput {
    fn from(call: AccountCall) -> Self {
        CallInput::Invoke(call)
    }
}

/// What one spell batch produced, in execution order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CastReceipt {
    pub targets: Vec<Address>,
    pub event_names: Vec<String>,
    pub event_params: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    None,
    Bool(bool),
    Uint(u128),
    Address(Address),
    Magic(Selector),
    Cast(CastReceipt),
}

impl Output {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Output::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Output::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Output::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn into_receipt(self) -> Option<CastReceipt> {
        match self {
            Output::Cast(r) => Some(r),
            _ => None,
        }
    }
}

/// Storage owned by the proxy; every module and connector works on this.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountStorage {
    pub auth: BTreeSet<Address>,
    pub beta: bool,
    /// Free-form slots for connector state.
    pub slots: BTreeMap<String, Vec<u8>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountState {
    /// Proxy template this account was cloned from.
    pub template: Address,
    pub version: u64,
    pub storage: AccountStorage,
}

impl AccountState {
    pub fn new(template: Address, version: u64) -> Self {
        Self {
            template,
            version,
            storage: AccountStorage::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_magic_matches_selectors() {
        let call = AccountCall::OnErc721Received {
            operator: Address::ZERO,
            from: Address::ZERO,
            token_id: 1,
            data: vec![],
        };
        assert_eq!(call.selector(), ERC721_RECEIVED);
        let call = AccountCall::OnErc1155BatchReceived {
            operator: Address::ZERO,
            from: Address::ZERO,
            ids: vec![],
            values: vec![],
            data: vec![],
        };
        assert_eq!(call.selector(), ERC1155_BATCH_RECEIVED);
    }

    #[test]
    fn test_custom_call_uses_its_signature() {
        let call = AccountCall::Custom {
            signature: "transfer(address,uint256)".into(),
            args: vec![],
        };
        assert_eq!(call.selector().to_hex(), "0xa9059cbb");
    }
}
