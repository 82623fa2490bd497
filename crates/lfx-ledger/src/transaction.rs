//! # Multi-Signature Transactions
//!
//! A `TransactionDraft` is a mutable list of transfer legs. Freezing it
//! against one node produces a `FrozenTransaction`: an immutable body plus
//! its canonical bytes. Every co-signer signs those exact bytes, so the
//! body can no longer change once the first signature exists.
//!
//! `SignatureMap` collects one signature per public key. Re-attaching the
//! same key with the same signature is a no-op; a different signature for
//! an already-present key is refused.

use std::collections::{BTreeMap, BTreeSet};

use lfx_core::{AccountId, CanonicalBytes, ContentDigest, NodeId, TransactionId};
use lfx_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::Asset;

/// One side of a balance movement. Negative amounts debit the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLeg {
    pub asset: Asset,
    pub account: AccountId,
    pub amount: i64,
}

/// A transaction under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// Account paying for the transaction. Defaults to the client operator.
    #[serde(default)]
    pub payer: Option<AccountId>,
    pub transfers: Vec<TransferLeg>,
    #[serde(default)]
    pub memo: Option<String>,
}

impl TransactionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the paying account.
    pub fn with_payer(mut self, payer: AccountId) -> Self {
        self.payer = Some(payer);
        self
    }

    /// Attach a memo.
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Move `amount` of `asset` from `source` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidTransaction` if `amount` does not fit a
    /// signed leg.
    pub fn transfer(
        &mut self,
        asset: Asset,
        source: AccountId,
        destination: AccountId,
        amount: u64,
    ) -> Result<&mut Self, LedgerError> {
        let signed = signed_amount(amount)?;
        self.transfers.push(TransferLeg {
            asset,
            account: source,
            amount: -signed,
        });
        self.transfers.push(TransferLeg {
            asset,
            account: destination,
            amount: signed,
        });
        Ok(self)
    }

    /// Add a single leg. Positive credits, negative debits.
    pub fn leg(&mut self, asset: Asset, account: AccountId, amount: i64) -> &mut Self {
        self.transfers.push(TransferLeg {
            asset,
            account,
            amount,
        });
        self
    }

    /// Net movement per asset. A valid transfer nets to zero everywhere.
    pub fn net_by_asset(&self) -> BTreeMap<Asset, i128> {
        net_by_asset(&self.transfers)
    }

    /// Accounts with a net debit in any asset.
    pub fn debited_accounts(&self) -> BTreeSet<AccountId> {
        debited_accounts(&self.transfers)
    }
}

/// Convert an unsigned amount to a leg amount.
pub fn signed_amount(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount)
        .map_err(|_| LedgerError::InvalidTransaction(format!("amount {amount} out of range")))
}

pub(crate) fn net_by_asset(transfers: &[TransferLeg]) -> BTreeMap<Asset, i128> {
    let mut net = BTreeMap::new();
    for leg in transfers {
        *net.entry(leg.asset).or_insert(0i128) += i128::from(leg.amount);
    }
    net
}

pub(crate) fn debited_accounts(transfers: &[TransferLeg]) -> BTreeSet<AccountId> {
    let mut per_account: BTreeMap<(Asset, AccountId), i128> = BTreeMap::new();
    for leg in transfers {
        *per_account.entry((leg.asset, leg.account)).or_insert(0) += i128::from(leg.amount);
    }
    per_account
        .into_iter()
        .filter(|(_, net)| *net < 0)
        .map(|((_, account), _)| account)
        .collect()
}

/// The signed portion of a frozen transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub transaction_id: TransactionId,
    pub node: NodeId,
    pub transfers: Vec<TransferLeg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// A transaction body fixed to one node, ready for independent signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenTransaction {
    body: TransactionBody,
    bytes: CanonicalBytes,
    digest: ContentDigest,
}

impl FrozenTransaction {
    /// Freeze `body`, computing the bytes every signer covers.
    pub fn new(body: TransactionBody) -> Result<Self, LedgerError> {
        let bytes = CanonicalBytes::new(&body)?;
        let digest = ContentDigest::sha256(&bytes);
        Ok(Self {
            body,
            bytes,
            digest,
        })
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.body.transaction_id
    }

    pub fn node(&self) -> NodeId {
        self.body.node
    }

    /// The bytes covered by every signature.
    pub fn bytes(&self) -> &CanonicalBytes {
        &self.bytes
    }

    /// SHA-256 of the canonical bytes.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// Sign the frozen bytes.
    pub fn sign(&self, key: &Ed25519KeyPair) -> Ed25519Signature {
        key.sign(&self.bytes)
    }

    /// Accounts whose key must sign because they are debited.
    pub fn debited_accounts(&self) -> BTreeSet<AccountId> {
        debited_accounts(&self.body.transfers)
    }
}

/// Signatures over one frozen transaction, keyed by signer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureMap {
    entries: BTreeMap<Ed25519PublicKey, Ed25519Signature>,
}

impl SignatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a signature. Returns `true` if the key was not present.
    ///
    /// # Errors
    ///
    /// Refuses a signature that differs from the one already held for
    /// `public_key`.
    pub fn insert(
        &mut self,
        public_key: Ed25519PublicKey,
        signature: Ed25519Signature,
    ) -> Result<bool, LedgerError> {
        match self.entries.get(&public_key) {
            Some(existing) if *existing == signature => Ok(false),
            Some(_) => Err(LedgerError::InvalidTransaction(format!(
                "conflicting signature for key {public_key}"
            ))),
            None => {
                self.entries.insert(public_key, signature);
                Ok(true)
            }
        }
    }

    pub fn get(&self, public_key: &Ed25519PublicKey) -> Option<&Ed25519Signature> {
        self.entries.get(public_key)
    }

    /// Distinct signing keys.
    pub fn signers(&self) -> BTreeSet<Ed25519PublicKey> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ed25519PublicKey, &Ed25519Signature)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lfx_core::AssetId;

    fn frozen(draft: &TransactionDraft) -> FrozenTransaction {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        FrozenTransaction::new(TransactionBody {
            transaction_id: TransactionId::new(AccountId::new(2), start),
            node: NodeId::new(3),
            transfers: draft.transfers.clone(),
            memo: None,
        })
        .unwrap()
    }

    #[test]
    fn transfer_adds_balanced_legs() {
        let token = Asset::Token(AssetId::new(9));
        let mut draft = TransactionDraft::new();
        draft
            .transfer(token, AccountId::new(10), AccountId::new(11), 25)
            .unwrap();
        assert_eq!(draft.transfers.len(), 2);
        assert_eq!(draft.net_by_asset().get(&token), Some(&0));
        assert_eq!(
            draft.debited_accounts(),
            [AccountId::new(10)].into_iter().collect()
        );
    }

    #[test]
    fn debits_are_netted_per_account() {
        let mut draft = TransactionDraft::new();
        draft
            .leg(Asset::Native, AccountId::new(10), -5)
            .leg(Asset::Native, AccountId::new(10), 5);
        assert!(draft.debited_accounts().is_empty());
    }

    #[test]
    fn amount_overflow_is_rejected() {
        let mut draft = TransactionDraft::new();
        assert!(draft
            .transfer(Asset::Native, AccountId::new(1), AccountId::new(2), u64::MAX)
            .is_err());
    }

    #[test]
    fn every_signer_covers_the_same_bytes() {
        let mut draft = TransactionDraft::new();
        draft
            .transfer(Asset::Native, AccountId::new(10), AccountId::new(11), 1)
            .unwrap();
        let tx = frozen(&draft);
        let a = Ed25519KeyPair::from_seed(&[1; 32]);
        let b = Ed25519KeyPair::from_seed(&[2; 32]);
        lfx_crypto::verify(tx.bytes(), &tx.sign(&a), &a.public_key()).unwrap();
        lfx_crypto::verify(tx.bytes(), &tx.sign(&b), &b.public_key()).unwrap();
        assert_eq!(tx, frozen(&draft));
    }

    #[test]
    fn signature_map_keeps_one_entry_per_key() {
        let mut draft = TransactionDraft::new();
        draft
            .transfer(Asset::Native, AccountId::new(10), AccountId::new(11), 1)
            .unwrap();
        let tx = frozen(&draft);
        let key = Ed25519KeyPair::from_seed(&[1; 32]);
        let mut map = SignatureMap::new();
        assert!(map.insert(key.public_key(), tx.sign(&key)).unwrap());
        assert!(!map.insert(key.public_key(), tx.sign(&key)).unwrap());
        assert_eq!(map.len(), 1);

        let other = Ed25519KeyPair::from_seed(&[2; 32]);
        assert!(map.insert(key.public_key(), tx.sign(&other)).is_err());
        assert_eq!(map.get(&key.public_key()), Some(&tx.sign(&key)));
    }
}
