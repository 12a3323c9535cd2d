use std::{fmt, time::Duration};

use shared::error::{ErrorCode, ReportError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    NotConnected,
    ClientUninitialized,
    CounterpartUninitialized,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Precondition::NotConnected => "connect your wallet first",
            Precondition::ClientUninitialized => "chain client is not initialized",
            Precondition::CounterpartUninitialized => "demo counterpart account is not initialized",
        })
    }
}

/// The external call a failure or timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ExtensionConnect,
    ExtensionDisconnect,
    ExtensionIsConnected,
    ExtensionAccount,
    ExtensionBalance,
    ExtensionNetwork,
    ExtensionSwitchNetwork,
    ExtensionSignAndSubmit,
    ExtensionSignTransaction,
    ExtensionSignMessage,
    ChainFund,
    ChainBuild,
    ChainSubmit,
    ChainFinality,
    ChainView,
    ChainIndexer,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ExtensionConnect => "extension connect",
            Step::ExtensionDisconnect => "extension disconnect",
            Step::ExtensionIsConnected => "extension connection check",
            Step::ExtensionAccount => "extension account query",
            Step::ExtensionBalance => "extension balance query",
            Step::ExtensionNetwork => "extension network query",
            Step::ExtensionSwitchNetwork => "extension network switch",
            Step::ExtensionSignAndSubmit => "extension sign and submit",
            Step::ExtensionSignTransaction => "extension sign transaction",
            Step::ExtensionSignMessage => "extension sign message",
            Step::ChainFund => "faucet funding",
            Step::ChainBuild => "transaction build",
            Step::ChainSubmit => "transaction submit",
            Step::ChainFinality => "finality wait",
            Step::ChainView => "view call",
            Step::ChainIndexer => "indexer query",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("wallet extension is not installed")]
    ExtensionUnavailable,
    #[error("{0}")]
    PreconditionUnmet(Precondition),
    #[error("{step} failed: {message}")]
    ExternalCall { step: Step, message: String },
    #[error("{step} timed out after {after:?}")]
    Timeout { step: Step, after: Duration },
    #[error("malformed {what} returned by wallet: {message}")]
    Deserialization { what: &'static str, message: String },
    #[error("funding demo counterpart failed: {0}")]
    FundingFailed(Box<DispatchError>),
    #[error("transfer failed: {0}")]
    TransferFailed(Box<DispatchError>),
}

impl DispatchError {
    pub fn external(step: Step, err: anyhow::Error) -> Self {
        DispatchError::ExternalCall {
            step,
            message: format!("{err:#}"),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::ExtensionUnavailable => ErrorCode::ExtensionUnavailable,
            DispatchError::PreconditionUnmet(_) => ErrorCode::PreconditionUnmet,
            DispatchError::ExternalCall { .. } => ErrorCode::ExternalCall,
            DispatchError::Timeout { .. } => ErrorCode::Timeout,
            DispatchError::Deserialization { .. } => ErrorCode::Deserialization,
            DispatchError::FundingFailed(_) => ErrorCode::FundingFailed,
            DispatchError::TransferFailed(_) => ErrorCode::TransferFailed,
        }
    }
}

impl From<&DispatchError> for ReportError {
    fn from(value: &DispatchError) -> Self {
        ReportError::new(value.code(), value.to_string())
    }
}
