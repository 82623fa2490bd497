//! Shared helpers for the fixture integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lfx_core::{AccountId, AssetId, NodeId, TopicId};
use lfx_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use lfx_fixtures::{FixtureConfig, FixtureContext};
use lfx_ledger::{
    AssetBalance, AssetConfig, AssetInfo, FrozenTransaction, LedgerClient, LedgerConfig,
    LedgerError, LedgerRecord, Receipt, ReceiptStatus, SandboxConfig, SandboxLedger,
    SignatureMap, TopicConfig, TopicSubscription, TransactionDraft, TransactionKind,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A sandbox context with no mirror delay.
pub fn sandbox() -> (FixtureContext, SandboxLedger) {
    FixtureContext::sandbox().expect("sandbox context")
}

/// A context over a `ProbeLedger` wrapping a fresh sandbox.
pub fn probed() -> (FixtureContext, Arc<ProbeLedger>, SandboxLedger) {
    let config = LedgerConfig::sandbox();
    let sandbox = SandboxLedger::for_config(&config, SandboxConfig::default());
    let probe = Arc::new(ProbeLedger::new(sandbox.clone()));
    let ledger: Arc<dyn LedgerClient> = probe.clone();
    let ctx = FixtureContext::from_config(ledger, &config, FixtureConfig::for_sandbox())
        .expect("probed context");
    (ctx, probe, sandbox)
}

/// Journal entries of `kind` that succeeded.
pub fn successes(sandbox: &SandboxLedger, kind: TransactionKind) -> Vec<LedgerRecord> {
    sandbox
        .records_of(kind)
        .into_iter()
        .filter(|record| record.status.is_success())
        .collect()
}

/// How a broken topic subscription behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFault {
    /// The stream yields this error first.
    Error(LedgerError),
    /// The stream ends without a message.
    Closed,
}

/// Sandbox wrapper that yields before every call, so concurrent callers
/// interleave. It can fail the n-th account creation and break topic
/// subscriptions.
pub struct ProbeLedger {
    inner: SandboxLedger,
    creates: AtomicUsize,
    fail_create_at: Mutex<Option<usize>>,
    stream_fault: Mutex<Option<StreamFault>>,
}

impl ProbeLedger {
    pub fn new(inner: SandboxLedger) -> Self {
        Self {
            inner,
            creates: AtomicUsize::new(0),
            fail_create_at: Mutex::new(None),
            stream_fault: Mutex::new(None),
        }
    }

    /// Every later subscription misbehaves as `fault` describes.
    pub fn break_subscriptions(&self, fault: StreamFault) {
        *self.stream_fault.lock() = Some(fault);
    }

    /// Reject the `n`-th account creation from now on, counting from 1.
    pub fn fail_create_at(&self, n: usize) {
        let seen = self.creates.load(Ordering::SeqCst);
        *self.fail_create_at.lock() = Some(seen + n);
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for ProbeLedger {
    fn operator(&self) -> AccountId {
        self.inner.operator()
    }

    fn with_operator(&self, account: AccountId, key: Ed25519KeyPair) -> Arc<dyn LedgerClient> {
        self.inner.with_operator(account, key)
    }

    async fn create_account(
        &self,
        initial_balance: u64,
        public_key: Ed25519PublicKey,
    ) -> Result<Receipt, LedgerError> {
        tokio::task::yield_now().await;
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_create_at.lock() == Some(n) {
            self.inner
                .fail_next(TransactionKind::AccountCreate, ReceiptStatus::InsufficientAccountBalance);
        }
        self.inner.create_account(initial_balance, public_key).await
    }

    async fn native_balance(&self, account: AccountId) -> Result<u64, LedgerError> {
        tokio::task::yield_now().await;
        self.inner.native_balance(account).await
    }

    async fn asset_balance(
        &self,
        account: AccountId,
        asset: AssetId,
    ) -> Result<AssetBalance, LedgerError> {
        tokio::task::yield_now().await;
        self.inner.asset_balance(account, asset).await
    }

    async fn asset_info(&self, asset: AssetId) -> Result<AssetInfo, LedgerError> {
        self.inner.asset_info(asset).await
    }

    async fn transfer_native(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError> {
        tokio::task::yield_now().await;
        self.inner.transfer_native(from, to, amount, signer).await
    }

    async fn transfer_asset(
        &self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError> {
        tokio::task::yield_now().await;
        self.inner.transfer_asset(asset, from, to, amount, signer).await
    }

    async fn create_asset(
        &self,
        config: &AssetConfig,
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError> {
        self.inner.create_asset(config, signers).await
    }

    async fn mint_asset(
        &self,
        asset: AssetId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError> {
        self.inner.mint_asset(asset, amount, signer).await
    }

    async fn associate_asset(
        &self,
        account: AccountId,
        asset: AssetId,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError> {
        self.inner.associate_asset(account, asset, signer).await
    }

    async fn create_topic(
        &self,
        config: &TopicConfig,
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError> {
        self.inner.create_topic(config, signers).await
    }

    async fn publish_to_topic(
        &self,
        topic: TopicId,
        message: &[u8],
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError> {
        self.inner.publish_to_topic(topic, message, signers).await
    }

    async fn subscribe_topic(
        &self,
        topic: TopicId,
        start: DateTime<Utc>,
    ) -> Result<TopicSubscription, LedgerError> {
        let fault = self.stream_fault.lock().clone();
        match fault {
            None => self.inner.subscribe_topic(topic, start).await,
            Some(fault) => {
                let (tx, rx) = mpsc::unbounded_channel();
                if let StreamFault::Error(err) = fault {
                    let _ = tx.send(Err(err));
                }
                Ok(TopicSubscription::new(topic, rx))
            }
        }
    }

    async fn freeze(
        &self,
        draft: &TransactionDraft,
        node: NodeId,
    ) -> Result<FrozenTransaction, LedgerError> {
        self.inner.freeze(draft, node).await
    }

    async fn submit(
        &self,
        frozen: &FrozenTransaction,
        signatures: &SignatureMap,
    ) -> Result<Receipt, LedgerError> {
        self.inner.submit(frozen, signatures).await
    }
}
