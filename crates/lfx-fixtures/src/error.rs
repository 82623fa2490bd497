//! # Fixture Errors
//!
//! Everything a scenario step can fail with. Ledger rejections carry the
//! receipt status together with the accounts and amount involved so the
//! rendered message is enough to diagnose a failed step.
//!
//! `FixtureError` is `Clone`: one bootstrap result is shared by every
//! caller that waited on it.

use lfx_core::{CryptoError, IdError};
use lfx_ledger::{Asset, ConfigError, LedgerError, ReceiptStatus};
use thiserror::Error;

/// Fixture that must be created before it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    Token,
    Topic,
}

impl std::fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token => f.write_str("token"),
            Self::Topic => f.write_str("topic"),
        }
    }
}

/// Errors surfaced to scenario steps.
#[derive(Error, Debug, Clone)]
pub enum FixtureError {
    /// No actor is registered under this name.
    #[error("actor \"{name}\" does not exist")]
    UnknownActor { name: String },

    /// Bootstrapping the actor pool failed. The next access retries.
    #[error("bootstrap failed: {source}")]
    BootstrapFailure { source: Box<FixtureError> },

    /// The ledger accepted the transaction and returned a non-success status.
    #[error("{operation} rejected with {status}: {context}")]
    OperationRejected {
        operation: &'static str,
        status: ReceiptStatus,
        context: String,
    },

    /// A multi-party transaction lacks signatures for one of its policies.
    #[error("{policy} requires {required} signature(s), {collected} collected")]
    InsufficientSignatures {
        policy: String,
        required: u32,
        collected: u32,
    },

    /// The token or topic has not been created yet.
    #[error("{kind} has not been created")]
    AssetNotInitialized { kind: FixtureKind },

    /// Transfer legs for one asset do not net to zero.
    #[error("{asset} legs do not balance (net {net})")]
    Unbalanced { asset: Asset, net: i128 },

    /// Total supply after a mint differs from what the mint implies.
    #[error("total supply is {actual}, expected {expected}")]
    SupplyMismatch { expected: u64, actual: u64 },

    /// An operation expected to be rejected went through.
    #[error("{operation} succeeded but was expected to be rejected")]
    UnexpectedSuccess { operation: &'static str },

    /// An actor cannot fund its own balance.
    #[error("actor \"{name}\" cannot be reconciled against itself")]
    SelfFunding { name: String },

    /// Threshold key parameters are out of range.
    #[error("invalid threshold key: {0}")]
    InvalidThreshold(String),

    /// A topic subscription reported an error or ended without a message.
    #[error("topic subscription failed: {0}")]
    Subscription(String),

    /// A scenario observed a state different from the one it asserts.
    #[error("check failed: {0}")]
    CheckFailed(String),

    #[error(transparent)]
    Identifier(#[from] IdError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FixtureError {
    /// Receipt status carried by a rejection, if any.
    pub fn status(&self) -> Option<ReceiptStatus> {
        match self {
            Self::OperationRejected { status, .. } => Some(*status),
            Self::BootstrapFailure { source } => source.status(),
            _ => None,
        }
    }
}

/// Turn a receipt status into `Ok(())` or `OperationRejected`.
pub(crate) fn ensure_success(
    operation: &'static str,
    status: ReceiptStatus,
    context: impl FnOnce() -> String,
) -> Result<(), FixtureError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(FixtureError::OperationRejected {
            operation,
            status,
            context: context(),
        })
    }
}
