//! # lfx-core: Foundational Types for Ledger Fixtures
//!
//! The leaf of the workspace dependency DAG. Defines the value types every
//! other crate shares when talking about a ledger: entity identifiers,
//! logical actor names, and the canonical byte form that transaction bodies
//! are signed over.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for ledger entities.** `AccountId`, `AssetId`,
//!    `TopicId` and `NodeId` are distinct types. An asset id cannot be passed
//!    where an account is expected.
//!
//! 2. **`CanonicalBytes` for everything that gets signed.** Independently
//!    produced signatures must cover the same bytes, so transaction bodies are
//!    serialized through one RFC 8785 pipeline and nowhere else.
//!
//! 3. **Actor names are validated once.** `ActorName` rejects empty and
//!    whitespace-bearing names at construction, so registry lookups never
//!    deal with malformed keys.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lfx-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;

pub use canonical::CanonicalBytes;
pub use digest::{ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, CryptoError, IdError};
pub use identity::{AccountId, ActorName, AssetId, NodeId, TopicId, TransactionId};
