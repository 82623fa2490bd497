//! # lfx-fixtures: Ledger Test Fixtures
//!
//! Named actors, balances, tokens, topics and multi-party transfers for
//! scenario tests against a ledger.
//!
//! ## Architecture
//!
//! - **Registry** (`registry.rs`): resolves actor names to identities and
//!   provisions the actor pool once, on first access. Concurrent callers
//!   join the same in-flight bootstrap.
//!
//! - **Reconciler** (`reconcile.rs`): brings a balance to a target with at
//!   most one transfer whose source is always its signer. Token balances are
//!   associated first.
//!
//! - **Fixtures** (`token.rs`, `topic.rs`): hold the current asset and topic
//!   and expose create, mint, query, publish and subscribe-once.
//!
//! - **Assembler** (`multiparty.rs`): builds, freezes, co-signs and submits
//!   transfers that touch several accounts.
//!
//! - **Context** (`context.rs`): one value per test run bundling the above
//!   over a single `LedgerClient`.
//!
//! ## Crate Policy
//!
//! - Every ledger rejection surfaces as `FixtureError` with its receipt
//!   status. The only tolerated rejection is re-associating an account with
//!   an asset it already holds.
//! - No retries. A failed step stays failed.
//! - Locks are never held across an `.await`.

pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod multiparty;
pub mod reconcile;
pub mod registry;
pub mod scenarios;
pub mod token;
pub mod topic;

pub use config::FixtureConfig;
pub use context::FixtureContext;
pub use error::{FixtureError, FixtureKind};
pub use identity::Identity;
pub use multiparty::{MultiPartyBuilder, MultiPartyTransfer, RequiredPolicy};
pub use reconcile::{BalanceReconciler, Direction, ReconcileOutcome, Transfer};
pub use registry::Registry;
pub use scenarios::{Scenario, ScenarioReport};
pub use token::{MintExpectation, MintOutcome, TokenField, TokenFieldValue, TokenFixture, TokenSpec};
pub use topic::{PendingMessage, TopicFixture};
