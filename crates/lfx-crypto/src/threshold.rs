//! # Threshold Keys and Key Policies
//!
//! A `ThresholdKey` requires `k` signatures out of an ordered set of `n`
//! member public keys. A `KeyPolicy` is what a ledger entity carries as its
//! admin or submit key: either one public key or a threshold key.
//!
//! Both are immutable once built. Satisfaction is evaluated against the set
//! of public keys that produced valid signatures; duplicate signatures from
//! one member count once.

use std::collections::BTreeSet;

use lfx_core::CryptoError;
use serde::{Deserialize, Serialize};

use crate::ed25519::Ed25519PublicKey;

/// A k-of-n authorization policy over a fixed, ordered member set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdKeyRepr")]
pub struct ThresholdKey {
    members: Vec<Ed25519PublicKey>,
    threshold: u32,
}

#[derive(Deserialize)]
struct ThresholdKeyRepr {
    members: Vec<Ed25519PublicKey>,
    threshold: u32,
}

impl TryFrom<ThresholdKeyRepr> for ThresholdKey {
    type Error = CryptoError;

    fn try_from(repr: ThresholdKeyRepr) -> Result<Self, Self::Error> {
        Self::new(repr.members, repr.threshold)
    }
}

impl ThresholdKey {
    /// Build a threshold key.
    ///
    /// # Errors
    ///
    /// `threshold` must lie in `[1, members.len()]` and members must be
    /// distinct.
    pub fn new(members: Vec<Ed25519PublicKey>, threshold: u32) -> Result<Self, CryptoError> {
        if members.is_empty() {
            return Err(CryptoError::KeyError(
                "threshold key needs at least one member".to_string(),
            ));
        }
        let distinct: BTreeSet<_> = members.iter().collect();
        if distinct.len() != members.len() {
            return Err(CryptoError::KeyError(
                "threshold key members must be distinct".to_string(),
            ));
        }
        if threshold == 0 || threshold as usize > members.len() {
            return Err(CryptoError::KeyError(format!(
                "threshold must be in [1, {}], got {threshold}",
                members.len()
            )));
        }
        Ok(Self { members, threshold })
    }

    /// Member keys in construction order.
    pub fn members(&self) -> &[Ed25519PublicKey] {
        &self.members
    }

    /// Required number of member signatures.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Number of distinct members present in `signers`.
    pub fn signed_count(&self, signers: &BTreeSet<Ed25519PublicKey>) -> u32 {
        self.members.iter().filter(|m| signers.contains(m)).count() as u32
    }

    /// Whether at least `threshold` members are present in `signers`.
    pub fn is_satisfied_by(&self, signers: &BTreeSet<Ed25519PublicKey>) -> bool {
        self.signed_count(signers) >= self.threshold
    }
}

impl std::fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-of-{} threshold key", self.threshold, self.members.len())
    }
}

/// The key attached to a ledger entity: a single key or a threshold key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum KeyPolicy {
    /// One key must sign.
    Single(Ed25519PublicKey),
    /// `k` of `n` member keys must sign.
    Threshold(ThresholdKey),
}

impl KeyPolicy {
    /// Number of signatures this policy requires.
    pub fn required(&self) -> u32 {
        match self {
            Self::Single(_) => 1,
            Self::Threshold(key) => key.threshold(),
        }
    }

    /// Number of qualifying signatures present in `signers`.
    pub fn collected(&self, signers: &BTreeSet<Ed25519PublicKey>) -> u32 {
        match self {
            Self::Single(pk) => u32::from(signers.contains(pk)),
            Self::Threshold(key) => key.signed_count(signers),
        }
    }

    /// Whether `signers` satisfies this policy.
    pub fn is_satisfied_by(&self, signers: &BTreeSet<Ed25519PublicKey>) -> bool {
        self.collected(signers) >= self.required()
    }
}

impl From<Ed25519PublicKey> for KeyPolicy {
    fn from(pk: Ed25519PublicKey) -> Self {
        Self::Single(pk)
    }
}

impl From<ThresholdKey> for KeyPolicy {
    fn from(key: ThresholdKey) -> Self {
        Self::Threshold(key)
    }
}

impl std::fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(pk) => write!(f, "key {pk}"),
            Self::Threshold(key) => key.fmt(f),
        }
    }
}
