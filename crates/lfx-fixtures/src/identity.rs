//! Named actors.

use std::sync::Arc;

use lfx_core::{AccountId, ActorName};
use lfx_crypto::{Ed25519KeyPair, Ed25519PublicKey};

/// A logical actor: its ledger account, signing key and name.
///
/// Immutable. Clones share the key pair.
#[derive(Clone)]
pub struct Identity {
    name: ActorName,
    account: AccountId,
    key: Arc<Ed25519KeyPair>,
    public_key: Ed25519PublicKey,
}

impl Identity {
    pub fn new(name: ActorName, account: AccountId, key: Ed25519KeyPair) -> Self {
        let public_key = key.public_key();
        Self {
            name,
            account,
            key: Arc::new(key),
            public_key,
        }
    }

    pub fn name(&self) -> &ActorName {
        &self.name
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn key(&self) -> &Ed25519KeyPair {
        &self.key
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.public_key
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("account", &self.account)
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.account == other.account && self.public_key == other.public_key
    }
}

impl Eq for Identity {}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.account)
    }
}
