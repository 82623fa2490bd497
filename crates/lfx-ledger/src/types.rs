//! Value types exchanged with the ledger: receipts and their statuses,
//! asset and topic configuration, balance answers, topic messages.

use chrono::{DateTime, Utc};
use lfx_core::{AccountId, AssetId, TopicId, TransactionId};
use lfx_crypto::{Ed25519PublicKey, KeyPolicy};
use serde::{Deserialize, Serialize};

// -- Receipts -----------------------------------------------------------------

/// Terminal status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Success,
    InvalidSignature,
    InsufficientAccountBalance,
    InsufficientTokenBalance,
    InvalidAccountAmounts,
    TokenNotAssociatedToAccount,
    TokenAlreadyAssociatedToAccount,
    TokenMaxSupplyReached,
    TokenHasNoSupplyKey,
    InvalidTokenInitialSupply,
    InvalidTopicMessage,
    DuplicateTransaction,
}

impl ReceiptStatus {
    /// Whether the transaction took effect.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// The network's name for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InsufficientAccountBalance => "INSUFFICIENT_ACCOUNT_BALANCE",
            Self::InsufficientTokenBalance => "INSUFFICIENT_TOKEN_BALANCE",
            Self::InvalidAccountAmounts => "INVALID_ACCOUNT_AMOUNTS",
            Self::TokenNotAssociatedToAccount => "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT",
            Self::TokenAlreadyAssociatedToAccount => "TOKEN_ALREADY_ASSOCIATED_TO_ACCOUNT",
            Self::TokenMaxSupplyReached => "TOKEN_MAX_SUPPLY_REACHED",
            Self::TokenHasNoSupplyKey => "TOKEN_HAS_NO_SUPPLY_KEY",
            Self::InvalidTokenInitialSupply => "INVALID_TOKEN_INITIAL_SUPPLY",
            Self::InvalidTopicMessage => "INVALID_TOPIC_MESSAGE",
            Self::DuplicateTransaction => "DUPLICATE_TRANSACTION",
        }
    }
}

impl std::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmation of a submitted transaction.
///
/// Entity ids are populated by the transactions that create them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub status: ReceiptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<TopicId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_sequence_number: Option<u64>,
}

impl Receipt {
    /// A receipt with no created entity.
    pub fn new(transaction_id: TransactionId, status: ReceiptStatus) -> Self {
        Self {
            transaction_id,
            status,
            account_id: None,
            asset_id: None,
            topic_id: None,
            topic_sequence_number: None,
        }
    }
}

/// Kind of a ledger transaction, as journaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    AccountCreate,
    CryptoTransfer,
    TokenCreate,
    TokenMint,
    TokenAssociate,
    TopicCreate,
    TopicMessageSubmit,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AccountCreate => "account_create",
            Self::CryptoTransfer => "crypto_transfer",
            Self::TokenCreate => "token_create",
            Self::TokenMint => "token_mint",
            Self::TokenAssociate => "token_associate",
            Self::TopicCreate => "topic_create",
            Self::TopicMessageSubmit => "topic_message_submit",
        };
        f.write_str(s)
    }
}

// -- Assets -------------------------------------------------------------------

/// What a balance or transfer leg is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Asset {
    /// The ledger's native currency.
    Native,
    /// A fungible token.
    Token(AssetId),
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Token(id) => write!(f, "asset {id}"),
        }
    }
}

/// Supply policy of a fungible asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupplyType {
    /// No upper bound on minting.
    Infinite,
    /// Total supply may never exceed `max_supply`.
    Finite { max_supply: u64 },
}

/// Parameters of an asset-create transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub initial_supply: u64,
    pub treasury: AccountId,
    #[serde(default)]
    pub admin_key: Option<Ed25519PublicKey>,
    #[serde(default)]
    pub supply_key: Option<Ed25519PublicKey>,
    pub supply_type: SupplyType,
}

/// Ledger-side description of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub asset_id: AssetId,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub total_supply: u64,
    pub supply_type: SupplyType,
    pub treasury: AccountId,
    pub admin_key: Option<Ed25519PublicKey>,
    pub supply_key: Option<Ed25519PublicKey>,
}

/// Answer to an asset balance query.
///
/// An account that never associated with the asset is distinct from one
/// that holds zero units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetBalance {
    NotAssociated,
    Held(u64),
}

impl AssetBalance {
    /// Units held, if associated.
    pub fn held(self) -> Option<u64> {
        match self {
            Self::NotAssociated => None,
            Self::Held(n) => Some(n),
        }
    }
}

// -- Topics -------------------------------------------------------------------

/// Parameters of a topic-create transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub memo: String,
    #[serde(default)]
    pub admin_key: Option<Ed25519PublicKey>,
    #[serde(default)]
    pub submit_key: Option<KeyPolicy>,
    #[serde(default)]
    pub auto_renew_account: Option<AccountId>,
}

/// A message delivered by a topic subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMessage {
    pub topic_id: TopicId,
    pub sequence_number: u64,
    pub consensus_timestamp: DateTime<Utc>,
    pub contents: Vec<u8>,
    pub payer: AccountId,
}

impl TopicMessage {
    /// Contents decoded as UTF-8, lossily.
    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents).into_owned()
    }
}
