//! User-facing failure taxonomy for onboarding steps.
//!
//! Every failure is scoped to the step that produced it. Nothing here is
//! fatal to the process; prior confirmed state is never rolled back.

use alloy::primitives::TxHash;
use thiserror::Error;

use super::progress::Action;

/// Failures of the off-chain signing request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// Client-side deadline elapsed before the service answered.
    #[error("Request timed out")]
    Timeout,

    /// Service answered with a non-2xx status.
    #[error("signing service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Service answered 2xx but the body could not be used.
    #[error("malformed signing response: {0}")]
    Malformed(String),

    /// Connection-level failure (DNS, TLS, reset).
    #[error("signing service unreachable: {0}")]
    Transport(String),
}

/// Failures of an onboarding action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// Action is gated off in the current state.
    #[error("{action} is not available in the current state")]
    NotAvailable { action: Action },

    /// Another action is still in flight.
    #[error("another action is already in progress")]
    Busy,

    /// Contract read failed.
    #[error("read failed: {0}")]
    Read(String),

    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Transaction could not be submitted or its receipt never arrived.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// Transaction was mined but reverted.
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    /// Write confirmed but the follow-up read never reflected it.
    #[error("{0} confirmed on-chain but not yet visible, refresh to retry")]
    NotYetVisible(&'static str),
}
