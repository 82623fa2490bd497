//! # Ledger Errors
//!
//! Failures that happen before or instead of a receipt: unknown entities,
//! malformed transactions, transport problems. A transaction the ledger
//! accepted and then rejected is not an error here; it is a `Receipt`
//! carrying a non-success `ReceiptStatus`.

use lfx_core::{AccountId, AssetId, CanonicalizationError, NodeId, TopicId};
use thiserror::Error;

/// Errors from the ledger client boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The account does not exist on the ledger.
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),

    /// The asset does not exist on the ledger.
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    /// The topic does not exist on the ledger.
    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),

    /// The node is not part of the network's address book.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The transaction failed local validation and was never sent.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The transaction body could not be canonicalized for signing.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    /// The network could not be reached or answered garbage.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<CanonicalizationError> for LedgerError {
    fn from(err: CanonicalizationError) -> Self {
        Self::Canonicalization(err.to_string())
    }
}
