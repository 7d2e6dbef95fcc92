use thiserror::Error;

use crate::types::Address;

/// Every failure a platform call can produce. `Display` is the revert reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    // --- Index registry ---
    #[error("not-master")]
    NotMaster,
    #[error("already-defined")]
    AlreadyDefined,
    #[error("already-a-master")]
    AlreadyAMaster,
    #[error("already-a-new-master")]
    AlreadyANewMaster,
    #[error("not-valid-address")]
    NotValidAddress,
    #[error("not-valid-account")]
    NotValidAccount,
    #[error("already-a-check")]
    AlreadyACheck,

    // --- List registry ---
    #[error("not-index")]
    NotIndex,
    #[error("not-account")]
    NotAccount,
    #[error("not-owner")]
    NotOwner,
    #[error("already-owner")]
    AlreadyOwner,
    #[error("already-linked")]
    AlreadyLinked,
    #[error("not-linked")]
    NotLinked,
    #[error("Removing-all-authorities")]
    RemovingAllAuthorities,

    // --- Implementations registry ---
    #[error("Implementations: not-master")]
    ImplementationsNotMaster,
    #[error("Implementations: _defaultImplementation address not valid")]
    DefaultImplementationNotValid,
    #[error("Implementations: _defaultImplementation cannot be same")]
    DefaultImplementationSame,
    #[error("Implementations: _implementation not valid.")]
    ImplementationNotValid,
    #[error("Implementations: _implementation already added.")]
    ImplementationAlreadyAdded,
    #[error("Implementations: _sig already added")]
    SigAlreadyAdded,
    #[error("Implementations: _implementation not found.")]
    ImplementationNotFound,

    // --- Connectors registry ---
    #[error("toggleChief: not-master")]
    ToggleChiefNotMaster,
    #[error("not-an-chief")]
    NotAChief,
    #[error("{0}: not same length")]
    NotSameLength(&'static str),
    #[error("addConnectors: _connectors address not valid")]
    AddConnectorAddressNotValid,
    #[error("updateConnectors: _connector address is not valid")]
    UpdateConnectorAddressNotValid,
    #[error("addConnectors: _connectorName added already")]
    ConnectorAddedAlready,
    #[error("{0}: _connectorName not added to update")]
    ConnectorNotAdded(&'static str),

    // --- Account proxy / default implementation ---
    #[error("LayerAccountV2: No implementation found for the given signature")]
    NoImplementation,
    #[error("not-an-account: {0}")]
    NotAnAccount(Address),
    #[error("not-self")]
    NotSelf,
    #[error("not-valid")]
    NotValid,
    #[error("already-enabled")]
    AlreadyEnabled,
    #[error("already-disabled")]
    AlreadyDisabled,

    // --- Execution engine ---
    #[error("{0}: permission-denied")]
    PermissionDenied(&'static str),
    #[error("{0}: length-invalid")]
    LengthInvalid(&'static str),
    #[error("{0}: array-length-invalid")]
    ArrayLengthInvalid(&'static str),
    #[error("{0}: not-connector")]
    NotConnector(&'static str),
    #[error("beta-not-enabled")]
    BetaNotEnabled,
    #[error("not-ok")]
    NotOk,
    #[error("flashloan-not-repaid")]
    FlashLoanNotRepaid,
    #[error("reentrant-call")]
    ReentrantCall,
    /// Failure reported by connector code, passed through unmodified.
    #[error("{0}")]
    Connector(String),

    // --- Host ---
    #[error("insufficient-balance")]
    InsufficientBalance,
    #[error("no code at {0}")]
    NoCode(Address),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl LayerError {
    /// True for errors raised because the caller lacks a role.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::NotMaster
                | Self::ImplementationsNotMaster
                | Self::ToggleChiefNotMaster
                | Self::NotAChief
                | Self::NotSelf
                | Self::NotIndex
                | Self::NotAccount
                | Self::PermissionDenied(_)
        )
    }
}

impl From<sled::Error> for LayerError {
    fn from(err: sled::Error) -> Self {
        LayerError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for LayerError {
    fn from(err: bincode::Error) -> Self {
        LayerError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LayerError {
    fn from(err: serde_json::Error) -> Self {
        LayerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
