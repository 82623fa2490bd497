//! # lfx-crypto: Cryptographic Primitives
//!
//! Provides the signing building blocks the fixtures need:
//!
//! - **Ed25519** key pairs, public keys and signatures. Signing input is
//!   always `&CanonicalBytes`, the frozen body of a transaction.
//! - **Private-key parsing** from the hex forms operators keep in their
//!   environment (raw 32-byte seed or DER-prefixed PKCS#8).
//! - **Threshold keys**: k-of-n policies over member public keys, and the
//!   `KeyPolicy` union used wherever a ledger entity carries a key.
//!
//! ## Crate Policy
//!
//! - Depends only on `lfx-core` internally.
//! - Tests use real Ed25519 keys and signatures; nothing is mocked.

pub mod ed25519;
pub mod threshold;

pub use ed25519::{verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use threshold::{KeyPolicy, ThresholdKey};
