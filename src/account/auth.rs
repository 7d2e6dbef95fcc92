//! Default implementation: the account's self-service surface.
//!
//! Answers every selector without an explicit route. Auth changes are written
//! to the account's own storage first and then mirrored into the list
//! registry, which rejects anything that would leave the two out of step.

use crate::account::types::{
    AccountCall, Output, ERC1155_BATCH_RECEIVED, ERC1155_RECEIVED, ERC721_RECEIVED,
};
use crate::error::{LayerError, Result};
use crate::events::Event;
use crate::ledger::{Env, Implementation};
use crate::types::Address;

pub const IMPLEMENTATION_VERSION: u128 = 1;

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultImplementation;

impl DefaultImplementation {
    fn ensure_self_or_index(env: &Env<'_>) -> Result<()> {
        if env.sender() != env.this() && env.sender() != env.index_address() {
            return Err(LayerError::NotSelf);
        }
        Ok(())
    }

    fn enable(env: &mut Env<'_>, user: Address) -> Result<Output> {
        Self::ensure_self_or_index(env)?;
        if user.is_zero() {
            return Err(LayerError::NotValid);
        }
        if !env.storage_mut()?.auth.insert(user) {
            return Err(LayerError::AlreadyEnabled);
        }
        env.list_add_auth(user)?;
        env.emit(Event::LogEnableUser { user });
        Ok(Output::None)
    }

    fn disable(env: &mut Env<'_>, user: Address) -> Result<Output> {
        Self::ensure_self_or_index(env)?;
        if user.is_zero() {
            return Err(LayerError::NotValid);
        }
        if !env.storage_mut()?.auth.remove(&user) {
            return Err(LayerError::AlreadyDisabled);
        }
        env.list_remove_auth(user)?;
        env.emit(Event::LogDisableUser { user });
        Ok(Output::None)
    }

    fn toggle_beta(env: &mut Env<'_>) -> Result<Output> {
        if env.sender() != env.this() {
            return Err(LayerError::NotSelf);
        }
        let storage = env.storage_mut()?;
        storage.beta = !storage.beta;
        let beta = storage.beta;
        env.emit(Event::LogBetaMode { beta });
        Ok(Output::None)
    }
}

impl Implementation for DefaultImplementation {
    fn name(&self) -> &str {
        "DefaultImplementation"
    }

    fn signatures(&self) -> Vec<&'static str> {
        vec![
            "enable(address)",
            "disable(address)",
            "isAuth(address)",
            "isBeta()",
            "toggleBeta()",
            "version()",
            "implementationVersion()",
            "layerIndex()",
            "onERC721Received(address,address,uint256,bytes)",
            "onERC1155Received(address,address,uint256,uint256,bytes)",
            "onERC1155BatchReceived(address,address,uint256[],uint256[],bytes)",
        ]
    }

    fn execute(&self, env: &mut Env<'_>, call: &AccountCall) -> Result<Output> {
        match call {
            AccountCall::Enable(user) => Self::enable(env, *user),
            AccountCall::Disable(user) => Self::disable(env, *user),
            AccountCall::IsAuth(user) => Ok(Output::Bool(env.storage()?.auth.contains(user))),
            AccountCall::IsBeta => Ok(Output::Bool(env.storage()?.beta)),
            AccountCall::ToggleBeta => Self::toggle_beta(env),
            AccountCall::Version => Ok(Output::Uint(u128::from(env.account()?.version))),
            AccountCall::ImplementationVersion => Ok(Output::Uint(IMPLEMENTATION_VERSION)),
            AccountCall::LayerIndex => Ok(Output::Address(env.index_address())),
            AccountCall::OnErc721Received { .. } => Ok(Output::Magic(ERC721_RECEIVED)),
            AccountCall::OnErc1155Received { .. } => Ok(Output::Magic(ERC1155_RECEIVED)),
            AccountCall::OnErc1155BatchReceived { .. } => Ok(Output::Magic(ERC1155_BATCH_RECEIVED)),
            _ => Err(LayerError::NoImplementation),
        }
    }
}
