//! # Ledger Client Trait
//!
//! The async surface the fixtures need from a ledger. Every submitting
//! operation resolves to a `Receipt` once the transaction reached a terminal
//! status; a non-success status is data, not an `Err`.
//!
//! A client acts as one operator account. The operator pays for every
//! transaction the client submits and its key counts as a signer on all of
//! them. `with_operator` derives a client acting as someone else.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lfx_core::{AccountId, AssetId, NodeId, TopicId};
use lfx_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::transaction::{FrozenTransaction, SignatureMap, TransactionDraft};
use crate::types::{AssetBalance, AssetConfig, AssetInfo, Receipt, TopicConfig, TopicMessage};

/// Ledger operations consumed by fixtures.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    /// The account paying for and implicitly signing every transaction.
    fn operator(&self) -> AccountId;

    /// A client sharing this ledger but operating as `account`.
    fn with_operator(&self, account: AccountId, key: Ed25519KeyPair) -> Arc<dyn LedgerClient>;

    /// Create an account keyed by `public_key`, funded from the operator.
    async fn create_account(
        &self,
        initial_balance: u64,
        public_key: Ed25519PublicKey,
    ) -> Result<Receipt, LedgerError>;

    async fn native_balance(&self, account: AccountId) -> Result<u64, LedgerError>;

    async fn asset_balance(
        &self,
        account: AccountId,
        asset: AssetId,
    ) -> Result<AssetBalance, LedgerError>;

    async fn asset_info(&self, asset: AssetId) -> Result<AssetInfo, LedgerError>;

    /// Move native currency. `signer` must hold the key of `from`.
    async fn transfer_native(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError>;

    /// Move asset units. `signer` must hold the key of `from`.
    async fn transfer_asset(
        &self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError>;

    /// Create a fungible asset. The treasury and the admin key must sign.
    async fn create_asset(
        &self,
        config: &AssetConfig,
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError>;

    /// Mint into the treasury. The supply key must sign.
    async fn mint_asset(
        &self,
        asset: AssetId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError>;

    /// Associate `account` with `asset`. The account key must sign.
    async fn associate_asset(
        &self,
        account: AccountId,
        asset: AssetId,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError>;

    async fn create_topic(
        &self,
        config: &TopicConfig,
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError>;

    /// Publish to a topic. The signers must satisfy its submit key, if any.
    async fn publish_to_topic(
        &self,
        topic: TopicId,
        message: &[u8],
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError>;

    /// Stream messages with a consensus timestamp at or after `start`.
    async fn subscribe_topic(
        &self,
        topic: TopicId,
        start: DateTime<Utc>,
    ) -> Result<TopicSubscription, LedgerError>;

    /// Fix a draft to a single node and assign its transaction id.
    async fn freeze(
        &self,
        draft: &TransactionDraft,
        node: NodeId,
    ) -> Result<FrozenTransaction, LedgerError>;

    /// Submit a frozen transaction with the signatures collected for it.
    async fn submit(
        &self,
        frozen: &FrozenTransaction,
        signatures: &SignatureMap,
    ) -> Result<Receipt, LedgerError>;
}

/// Live handle on a topic message stream.
///
/// Dropping the handle or calling `unsubscribe` stops delivery.
#[derive(Debug)]
pub struct TopicSubscription {
    id: Uuid,
    topic: TopicId,
    receiver: mpsc::UnboundedReceiver<Result<TopicMessage, LedgerError>>,
}

impl TopicSubscription {
    pub fn new(
        topic: TopicId,
        receiver: mpsc::UnboundedReceiver<Result<TopicMessage, LedgerError>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            receiver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> TopicId {
        self.topic
    }

    /// Next message or stream error. `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Result<TopicMessage, LedgerError>> {
        self.receiver.recv().await
    }

    /// Stop delivery.
    pub fn unsubscribe(mut self) {
        self.receiver.close();
        tracing::debug!(subscription = %self.id, topic = %self.topic, "unsubscribed");
    }
}
