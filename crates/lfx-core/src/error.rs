//! # Error Types: Leaf Errors
//!
//! Errors raised by the foundational types. Higher crates wrap these in
//! their own enums; nothing here knows about ledgers or fixtures.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be integers.
    #[error("float values are not permitted in canonical representations; use an integer amount: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),
}

/// Error parsing or validating an identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Entity ids are written `shard.realm.num`.
    #[error("invalid {kind} id {input:?}: expected shard.realm.num")]
    MalformedEntity {
        /// Which identifier type was being parsed.
        kind: &'static str,
        /// The rejected input.
        input: String,
    },

    /// Actor names must be non-empty and free of whitespace.
    #[error("invalid actor name {0:?}")]
    InvalidActorName(String),

    /// Transaction ids are written `payer@seconds.nanos`.
    #[error("invalid transaction id {0:?}")]
    MalformedTransaction(String),
}
