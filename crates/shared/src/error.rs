use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ExtensionUnavailable,
    PreconditionUnmet,
    ExternalCall,
    Timeout,
    Deserialization,
    FundingFailed,
    TransferFailed,
}

/// User-facing form of a failed action, suitable for an alert or a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ReportError {
    pub code: ErrorCode,
    pub message: String,
}

impl ReportError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failures the user can fix without retrying blindly: install the wallet or connect first.
    pub fn is_user_prompt(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ExtensionUnavailable | ErrorCode::PreconditionUnmet
        )
    }
}
