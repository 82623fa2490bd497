//! # In-Memory Sandbox Ledger
//!
//! `SandboxLedger` implements `LedgerClient` over shared in-process state.
//! It enforces the rules fixtures rely on the network to enforce:
//!
//! - the payer's key must sign, and the client operator's key signs
//!   implicitly;
//! - every account debited by a transfer must sign;
//! - transfer legs net to zero per asset, balances never go negative;
//! - asset balances require association, association happens once;
//! - minting needs the supply key and respects finite supply caps;
//! - topic messages must satisfy the topic's submit key policy;
//! - multi-party signatures are verified against the frozen bytes.
//!
//! Every transaction, accepted or not, lands in a journal recording its
//! kind, payer, explicit signer keys and status. `fail_next` forces the
//! next transaction of a kind to end in a chosen status.
//!
//! Fees are not charged.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lfx_core::{AccountId, AssetId, NodeId, TopicId, TransactionId};
use lfx_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::client::{LedgerClient, TopicSubscription};
use crate::config::{LedgerConfig, DEFAULT_NODE};
use crate::error::LedgerError;
use crate::transaction::{
    self, FrozenTransaction, SignatureMap, TransactionBody, TransactionDraft, TransferLeg,
};
use crate::types::{
    Asset, AssetBalance, AssetConfig, AssetInfo, Receipt, ReceiptStatus, SupplyType, TopicConfig,
    TopicMessage, TransactionKind,
};

/// First entity number handed out to created accounts, assets and topics.
const FIRST_ENTITY_NUM: u64 = 1001;

/// Sandbox parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Native balance the operator account starts with.
    pub operator_balance: u64,
    /// Nodes transactions may be frozen against.
    pub nodes: Vec<NodeId>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            operator_balance: 1_000_000,
            nodes: (3..=6).map(NodeId::new).collect(),
        }
    }
}

/// One journaled transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub payer: AccountId,
    /// Keys that signed explicitly. The operator's implicit signature is
    /// not listed.
    pub signers: BTreeSet<Ed25519PublicKey>,
    pub status: ReceiptStatus,
    /// Transfer legs, for transfer transactions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<TransferLeg>,
}

#[derive(Debug)]
struct AccountState {
    key: Ed25519PublicKey,
    balance: u64,
    assets: BTreeMap<AssetId, u64>,
}

#[derive(Debug)]
struct TopicState {
    config: TopicConfig,
    messages: Vec<TopicMessage>,
    subscribers: Vec<mpsc::UnboundedSender<Result<TopicMessage, LedgerError>>>,
}

#[derive(Debug)]
struct SandboxState {
    nodes: BTreeSet<NodeId>,
    accounts: BTreeMap<AccountId, AccountState>,
    assets: BTreeMap<AssetId, AssetInfo>,
    topics: BTreeMap<TopicId, TopicState>,
    next_entity: u64,
    clock: DateTime<Utc>,
    seen: BTreeSet<TransactionId>,
    faults: VecDeque<(TransactionKind, ReceiptStatus)>,
    journal: Vec<LedgerRecord>,
}

/// What a successful transaction created.
#[derive(Debug, Default)]
struct Created {
    account_id: Option<AccountId>,
    asset_id: Option<AssetId>,
    topic_id: Option<TopicId>,
    topic_sequence_number: Option<u64>,
}

type Outcome = Result<Result<Created, ReceiptStatus>, LedgerError>;

/// Shorthand for rejecting with a receipt status.
fn reject(status: ReceiptStatus) -> Outcome {
    Ok(Err(status))
}

impl SandboxState {
    /// Strictly increasing instant, used for transaction ids and consensus
    /// timestamps.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.clock = if now > self.clock {
            now
        } else {
            self.clock + Duration::nanoseconds(1)
        };
        self.clock
    }

    fn next_num(&mut self) -> u64 {
        let num = self.next_entity;
        self.next_entity += 1;
        num
    }

    fn account(&self, id: AccountId) -> Result<&AccountState, LedgerError> {
        self.accounts.get(&id).ok_or(LedgerError::UnknownAccount(id))
    }

    fn asset(&self, id: AssetId) -> Result<&AssetInfo, LedgerError> {
        self.assets.get(&id).ok_or(LedgerError::UnknownAsset(id))
    }

    fn take_fault(&mut self, kind: TransactionKind) -> Option<ReceiptStatus> {
        let index = self.faults.iter().position(|(k, _)| *k == kind)?;
        self.faults.remove(index).map(|(_, status)| status)
    }

    fn apply_transfers(
        &mut self,
        legs: &[TransferLeg],
        signers: &BTreeSet<Ed25519PublicKey>,
    ) -> Outcome {
        if legs.is_empty() {
            return Err(LedgerError::InvalidTransaction("no transfers".to_string()));
        }
        for leg in legs {
            self.account(leg.account)?;
            if let Asset::Token(asset) = leg.asset {
                self.asset(asset)?;
            }
        }
        if transaction::net_by_asset(legs).values().any(|net| *net != 0) {
            return reject(ReceiptStatus::InvalidAccountAmounts);
        }
        for debited in transaction::debited_accounts(legs) {
            if !signers.contains(&self.account(debited)?.key) {
                return reject(ReceiptStatus::InvalidSignature);
            }
        }

        let mut next: BTreeMap<(Asset, AccountId), i128> = BTreeMap::new();
        for leg in legs {
            let current = match next.get(&(leg.asset, leg.account)) {
                Some(v) => *v,
                None => {
                    let account = self.account(leg.account)?;
                    match leg.asset {
                        Asset::Native => i128::from(account.balance),
                        Asset::Token(asset) => match account.assets.get(&asset) {
                            Some(held) => i128::from(*held),
                            None => return reject(ReceiptStatus::TokenNotAssociatedToAccount),
                        },
                    }
                }
            };
            next.insert((leg.asset, leg.account), current + i128::from(leg.amount));
        }

        let mut updates = Vec::with_capacity(next.len());
        for ((asset, account), value) in next {
            match u64::try_from(value) {
                Ok(v) => updates.push((asset, account, v)),
                Err(_) => {
                    return reject(match asset {
                        Asset::Native => ReceiptStatus::InsufficientAccountBalance,
                        Asset::Token(_) => ReceiptStatus::InsufficientTokenBalance,
                    })
                }
            }
        }
        for (asset, account, value) in updates {
            if let Some(state) = self.accounts.get_mut(&account) {
                match asset {
                    Asset::Native => state.balance = value,
                    Asset::Token(id) => {
                        state.assets.insert(id, value);
                    }
                }
            }
        }
        Ok(Ok(Created::default()))
    }
}

/// In-memory ledger. Clones and `with_operator` views share state.
#[derive(Clone)]
pub struct SandboxLedger {
    state: Arc<Mutex<SandboxState>>,
    operator: AccountId,
    operator_key: Ed25519KeyPair,
}

impl std::fmt::Debug for SandboxLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxLedger")
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

impl SandboxLedger {
    /// Start a ledger whose genesis account `operator` is keyed by
    /// `operator_key`.
    pub fn new(config: SandboxConfig, operator: AccountId, operator_key: Ed25519KeyPair) -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert(
            operator,
            AccountState {
                key: operator_key.public_key(),
                balance: config.operator_balance,
                assets: BTreeMap::new(),
            },
        );
        let mut nodes: BTreeSet<NodeId> = config.nodes.into_iter().collect();
        if nodes.is_empty() {
            nodes.insert(DEFAULT_NODE);
        }
        let state = SandboxState {
            nodes,
            accounts,
            assets: BTreeMap::new(),
            topics: BTreeMap::new(),
            next_entity: FIRST_ENTITY_NUM.max(operator.num + 1),
            clock: DateTime::<Utc>::UNIX_EPOCH,
            seen: BTreeSet::new(),
            faults: VecDeque::new(),
            journal: Vec::new(),
        };
        tracing::debug!(%operator, "sandbox ledger started");
        Self {
            state: Arc::new(Mutex::new(state)),
            operator,
            operator_key,
        }
    }

    /// Start a ledger whose operator matches `ledger`'s credentials.
    pub fn for_config(ledger: &LedgerConfig, config: SandboxConfig) -> Self {
        Self::new(config, ledger.operator_account, ledger.operator_key.clone())
    }

    /// Force the next transaction of `kind` to end with `status`.
    pub fn fail_next(&self, kind: TransactionKind, status: ReceiptStatus) {
        self.state.lock().faults.push_back((kind, status));
    }

    /// Every transaction seen so far, oldest first.
    pub fn journal(&self) -> Vec<LedgerRecord> {
        self.state.lock().journal.clone()
    }

    /// Journaled transactions of one kind.
    pub fn records_of(&self, kind: TransactionKind) -> Vec<LedgerRecord> {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of accounts, the operator included.
    pub fn account_count(&self) -> usize {
        self.state.lock().accounts.len()
    }

    fn signer_set(&self, explicit: &[&Ed25519KeyPair]) -> BTreeSet<Ed25519PublicKey> {
        explicit.iter().map(|k| k.public_key()).collect()
    }

    /// Run one transaction under the state lock and journal it.
    fn execute<F>(
        &self,
        kind: TransactionKind,
        transaction_id: Option<TransactionId>,
        explicit: BTreeSet<Ed25519PublicKey>,
        transfers: Vec<TransferLeg>,
        apply: F,
    ) -> Result<Receipt, LedgerError>
    where
        F: FnOnce(&mut SandboxState, &BTreeSet<Ed25519PublicKey>) -> Outcome,
    {
        let mut state = self.state.lock();
        let transaction_id = match transaction_id {
            Some(id) => id,
            None => {
                let start = state.tick();
                TransactionId::new(self.operator, start)
            }
        };
        let payer = transaction_id.payer;
        let payer_key = state.account(payer)?.key;

        let mut signers = explicit.clone();
        signers.insert(self.operator_key.public_key());

        // An id is spent only once the transaction gets a receipt. A
        // precheck error from `apply` leaves it free for resubmission.
        let mut created = Created::default();
        let status = if state.seen.contains(&transaction_id) {
            ReceiptStatus::DuplicateTransaction
        } else {
            let status = if !signers.contains(&payer_key) {
                ReceiptStatus::InvalidSignature
            } else if let Some(forced) = state.take_fault(kind) {
                forced
            } else {
                match apply(&mut *state, &signers)? {
                    Ok(c) => {
                        created = c;
                        ReceiptStatus::Success
                    }
                    Err(status) => status,
                }
            };
            state.seen.insert(transaction_id);
            status
        };

        state.journal.push(LedgerRecord {
            transaction_id,
            kind,
            payer,
            signers: explicit,
            status,
            transfers,
        });
        drop(state);

        tracing::debug!(%transaction_id, %kind, %status, "sandbox transaction");
        Ok(Receipt {
            transaction_id,
            status,
            account_id: created.account_id,
            asset_id: created.asset_id,
            topic_id: created.topic_id,
            topic_sequence_number: created.topic_sequence_number,
        })
    }
}

#[async_trait]
impl LedgerClient for SandboxLedger {
    fn operator(&self) -> AccountId {
        self.operator
    }

    fn with_operator(&self, account: AccountId, key: Ed25519KeyPair) -> Arc<dyn LedgerClient> {
        Arc::new(Self {
            state: Arc::clone(&self.state),
            operator: account,
            operator_key: key,
        })
    }

    async fn create_account(
        &self,
        initial_balance: u64,
        public_key: Ed25519PublicKey,
    ) -> Result<Receipt, LedgerError> {
        let payer = self.operator;
        self.execute(
            TransactionKind::AccountCreate,
            None,
            BTreeSet::new(),
            Vec::new(),
            |state, _| {
                let Some(funder) = state.accounts.get_mut(&payer) else {
                    return Err(LedgerError::UnknownAccount(payer));
                };
                let Some(remaining) = funder.balance.checked_sub(initial_balance) else {
                    return reject(ReceiptStatus::InsufficientAccountBalance);
                };
                funder.balance = remaining;
                let id = AccountId::new(state.next_num());
                state.accounts.insert(
                    id,
                    AccountState {
                        key: public_key,
                        balance: initial_balance,
                        assets: BTreeMap::new(),
                    },
                );
                Ok(Ok(Created {
                    account_id: Some(id),
                    ..Created::default()
                }))
            },
        )
    }

    async fn native_balance(&self, account: AccountId) -> Result<u64, LedgerError> {
        Ok(self.state.lock().account(account)?.balance)
    }

    async fn asset_balance(
        &self,
        account: AccountId,
        asset: AssetId,
    ) -> Result<AssetBalance, LedgerError> {
        let state = self.state.lock();
        state.asset(asset)?;
        Ok(match state.account(account)?.assets.get(&asset) {
            Some(held) => AssetBalance::Held(*held),
            None => AssetBalance::NotAssociated,
        })
    }

    async fn asset_info(&self, asset: AssetId) -> Result<AssetInfo, LedgerError> {
        self.state.lock().asset(asset).cloned()
    }

    async fn transfer_native(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError> {
        let mut draft = TransactionDraft::new();
        draft.transfer(Asset::Native, from, to, amount)?;
        let legs = draft.transfers;
        let applied = legs.clone();
        self.execute(
            TransactionKind::CryptoTransfer,
            None,
            self.signer_set(&[signer]),
            legs,
            move |state, signers| state.apply_transfers(&applied, signers),
        )
    }

    async fn transfer_asset(
        &self,
        asset: AssetId,
        from: AccountId,
        to: AccountId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError> {
        let mut draft = TransactionDraft::new();
        draft.transfer(Asset::Token(asset), from, to, amount)?;
        let legs = draft.transfers;
        let applied = legs.clone();
        self.execute(
            TransactionKind::CryptoTransfer,
            None,
            self.signer_set(&[signer]),
            legs,
            move |state, signers| state.apply_transfers(&applied, signers),
        )
    }

    async fn create_asset(
        &self,
        config: &AssetConfig,
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError> {
        let config = config.clone();
        self.execute(
            TransactionKind::TokenCreate,
            None,
            self.signer_set(signers),
            Vec::new(),
            move |state, signers| {
                let treasury_key = state.account(config.treasury)?.key;
                if !signers.contains(&treasury_key) {
                    return reject(ReceiptStatus::InvalidSignature);
                }
                if let Some(admin) = config.admin_key {
                    if !signers.contains(&admin) {
                        return reject(ReceiptStatus::InvalidSignature);
                    }
                }
                if let SupplyType::Finite { max_supply } = config.supply_type {
                    if max_supply == 0 || config.initial_supply > max_supply {
                        return reject(ReceiptStatus::InvalidTokenInitialSupply);
                    }
                }
                let asset_id = AssetId::new(state.next_num());
                state.assets.insert(
                    asset_id,
                    AssetInfo {
                        asset_id,
                        name: config.name,
                        symbol: config.symbol,
                        decimals: config.decimals,
                        total_supply: config.initial_supply,
                        supply_type: config.supply_type,
                        treasury: config.treasury,
                        admin_key: config.admin_key,
                        supply_key: config.supply_key,
                    },
                );
                if let Some(treasury) = state.accounts.get_mut(&config.treasury) {
                    treasury.assets.insert(asset_id, config.initial_supply);
                }
                Ok(Ok(Created {
                    asset_id: Some(asset_id),
                    ..Created::default()
                }))
            },
        )
    }

    async fn mint_asset(
        &self,
        asset: AssetId,
        amount: u64,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError> {
        self.execute(
            TransactionKind::TokenMint,
            None,
            self.signer_set(&[signer]),
            Vec::new(),
            move |state, signers| {
                let info = state.asset(asset)?;
                let Some(supply_key) = info.supply_key else {
                    return reject(ReceiptStatus::TokenHasNoSupplyKey);
                };
                if !signers.contains(&supply_key) {
                    return reject(ReceiptStatus::InvalidSignature);
                }
                let Some(total) = info.total_supply.checked_add(amount) else {
                    return reject(ReceiptStatus::TokenMaxSupplyReached);
                };
                if let SupplyType::Finite { max_supply } = info.supply_type {
                    if total > max_supply {
                        return reject(ReceiptStatus::TokenMaxSupplyReached);
                    }
                }
                let treasury = info.treasury;
                let Some(held) = state
                    .accounts
                    .get_mut(&treasury)
                    .and_then(|a| a.assets.get_mut(&asset))
                else {
                    return reject(ReceiptStatus::TokenNotAssociatedToAccount);
                };
                *held += amount;
                if let Some(info) = state.assets.get_mut(&asset) {
                    info.total_supply = total;
                }
                Ok(Ok(Created::default()))
            },
        )
    }

    async fn associate_asset(
        &self,
        account: AccountId,
        asset: AssetId,
        signer: &Ed25519KeyPair,
    ) -> Result<Receipt, LedgerError> {
        self.execute(
            TransactionKind::TokenAssociate,
            None,
            self.signer_set(&[signer]),
            Vec::new(),
            move |state, signers| {
                state.asset(asset)?;
                let Some(holder) = state.accounts.get_mut(&account) else {
                    return Err(LedgerError::UnknownAccount(account));
                };
                if !signers.contains(&holder.key) {
                    return reject(ReceiptStatus::InvalidSignature);
                }
                if holder.assets.contains_key(&asset) {
                    return reject(ReceiptStatus::TokenAlreadyAssociatedToAccount);
                }
                holder.assets.insert(asset, 0);
                Ok(Ok(Created::default()))
            },
        )
    }

    async fn create_topic(
        &self,
        config: &TopicConfig,
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError> {
        let config = config.clone();
        self.execute(
            TransactionKind::TopicCreate,
            None,
            self.signer_set(signers),
            Vec::new(),
            move |state, signers| {
                if let Some(admin) = config.admin_key {
                    if !signers.contains(&admin) {
                        return reject(ReceiptStatus::InvalidSignature);
                    }
                }
                if let Some(renew) = config.auto_renew_account {
                    if !signers.contains(&state.account(renew)?.key) {
                        return reject(ReceiptStatus::InvalidSignature);
                    }
                }
                let topic_id = TopicId::new(state.next_num());
                state.topics.insert(
                    topic_id,
                    TopicState {
                        config,
                        messages: Vec::new(),
                        subscribers: Vec::new(),
                    },
                );
                Ok(Ok(Created {
                    topic_id: Some(topic_id),
                    ..Created::default()
                }))
            },
        )
    }

    async fn publish_to_topic(
        &self,
        topic: TopicId,
        message: &[u8],
        signers: &[&Ed25519KeyPair],
    ) -> Result<Receipt, LedgerError> {
        let contents = message.to_vec();
        let payer = self.operator;
        self.execute(
            TransactionKind::TopicMessageSubmit,
            None,
            self.signer_set(signers),
            Vec::new(),
            move |state, signers| {
                let consensus_timestamp = state.tick();
                let Some(entry) = state.topics.get_mut(&topic) else {
                    return Err(LedgerError::UnknownTopic(topic));
                };
                if let Some(policy) = &entry.config.submit_key {
                    if !policy.is_satisfied_by(signers) {
                        return reject(ReceiptStatus::InvalidSignature);
                    }
                }
                if contents.is_empty() {
                    return reject(ReceiptStatus::InvalidTopicMessage);
                }
                let sequence_number = entry.messages.len() as u64 + 1;
                let message = TopicMessage {
                    topic_id: topic,
                    sequence_number,
                    consensus_timestamp,
                    contents,
                    payer,
                };
                entry
                    .subscribers
                    .retain(|tx| tx.send(Ok(message.clone())).is_ok());
                entry.messages.push(message);
                Ok(Ok(Created {
                    topic_sequence_number: Some(sequence_number),
                    ..Created::default()
                }))
            },
        )
    }

    async fn subscribe_topic(
        &self,
        topic: TopicId,
        start: DateTime<Utc>,
    ) -> Result<TopicSubscription, LedgerError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        match state.topics.get_mut(&topic) {
            Some(entry) => {
                for message in entry
                    .messages
                    .iter()
                    .filter(|m| m.consensus_timestamp >= start)
                {
                    // The receiver is still owned here.
                    let _ = tx.send(Ok(message.clone()));
                }
                entry.subscribers.push(tx);
            }
            None => {
                let _ = tx.send(Err(LedgerError::UnknownTopic(topic)));
            }
        }
        Ok(TopicSubscription::new(topic, rx))
    }

    async fn freeze(
        &self,
        draft: &TransactionDraft,
        node: NodeId,
    ) -> Result<FrozenTransaction, LedgerError> {
        if draft.transfers.is_empty() {
            return Err(LedgerError::InvalidTransaction(
                "cannot freeze a transaction without transfers".to_string(),
            ));
        }
        let valid_start = {
            let mut state = self.state.lock();
            if !state.nodes.contains(&node) {
                return Err(LedgerError::UnknownNode(node));
            }
            state.tick()
        };
        let payer = draft.payer.unwrap_or(self.operator);
        FrozenTransaction::new(TransactionBody {
            transaction_id: TransactionId::new(payer, valid_start),
            node,
            transfers: draft.transfers.clone(),
            memo: draft.memo.clone(),
        })
    }

    async fn submit(
        &self,
        frozen: &FrozenTransaction,
        signatures: &SignatureMap,
    ) -> Result<Receipt, LedgerError> {
        if !self.state.lock().nodes.contains(&frozen.node()) {
            return Err(LedgerError::UnknownNode(frozen.node()));
        }
        let forged = signatures
            .iter()
            .any(|(pk, sig)| lfx_crypto::verify(frozen.bytes(), sig, pk).is_err());
        let legs = frozen.body().transfers.clone();
        let applied = legs.clone();
        self.execute(
            TransactionKind::CryptoTransfer,
            Some(frozen.transaction_id()),
            signatures.signers(),
            legs,
            move |state, signers| {
                if forged {
                    return reject(ReceiptStatus::InvalidSignature);
                }
                state.apply_transfers(&applied, signers)
            },
        )
    }
}
