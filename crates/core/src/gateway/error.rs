//! Error types for the gateway module.

use thiserror::Error;

use super::types::RejectionCode;

/// Failure of a single gateway call.
///
/// The `Display` output is what ends up on a failed upload, so it is written
/// for humans.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway answered with a non-2xx status.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        code: Option<RejectionCode>,
    },

    /// No response within the transport timeout.
    #[error("Gateway request timed out")]
    Timeout,

    /// The gateway could not be reached.
    #[error("Could not reach gateway: {0}")]
    ConnectionFailed(String),

    /// Any other network-level failure.
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body did not match the contract.
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    /// The request could not be built from the source file.
    #[error("Invalid gateway request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Classify a reqwest error the way the rest of the crate reports transport failures.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_connect() {
            GatewayError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            GatewayError::MalformedResponse(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }

    /// Rejection code reported by the gateway, if any.
    pub fn code(&self) -> Option<RejectionCode> {
        match self {
            GatewayError::Rejected { code, .. } => code.clone(),
            _ => None,
        }
    }

    /// HTTP status of a rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Rejected { .. } => "rejected",
            GatewayError::Timeout => "timeout",
            GatewayError::ConnectionFailed(_) => "connection",
            GatewayError::Transport(_) => "transport",
            GatewayError::MalformedResponse(_) => "malformed",
            GatewayError::InvalidRequest(_) => "invalid_request",
        }
    }
}
