//! # lfx-ledger: Ledger Client Boundary
//!
//! The narrow surface the fixtures consume from a distributed ledger:
//! account creation, balance queries, native and asset transfers, asset
//! creation/mint/association, topics, and the freeze/sign/submit cycle for
//! transactions that several keys co-sign.
//!
//! ## Architecture
//!
//! - **Trait** (`client.rs`): `LedgerClient` is the compile-time contract.
//!   A network-backed client and the sandbox are interchangeable behind
//!   `Arc<dyn LedgerClient>`.
//!
//! - **Sandbox** (`sandbox.rs`): `SandboxLedger` keeps the whole ledger in
//!   memory. It enforces what the fixtures depend on the network to enforce
//!   (signatures, balances, associations, supply caps, submit keys) and
//!   journals every transaction so tests can inspect signers.
//!
//! - **Receipts** (`types.rs`): every submitted transaction ends in a
//!   `Receipt` whose `ReceiptStatus` distinguishes success from failure.
//!   Transport-level problems are `LedgerError`, never a status.
//!
//! ## Crate Policy
//!
//! - Fees, consensus and retry/backoff are not modelled.
//! - Locks are never held across an `.await`.

pub mod client;
pub mod config;
pub mod error;
pub mod sandbox;
pub mod transaction;
pub mod types;

pub use client::{LedgerClient, TopicSubscription};
pub use config::{ConfigError, LedgerConfig, Network};
pub use error::LedgerError;
pub use sandbox::{LedgerRecord, SandboxConfig, SandboxLedger};
pub use transaction::{FrozenTransaction, SignatureMap, TransactionBody, TransactionDraft, TransferLeg};
pub use types::{
    Asset, AssetBalance, AssetConfig, AssetInfo, Receipt, ReceiptStatus, SupplyType, TopicConfig,
    TopicMessage, TransactionKind,
};
