//! Operator configuration.
//!
//! The operator is the account that pays for fixture transactions and
//! seeds the `admin` actor. Credentials come from the environment, using
//! the same variable names ledger SDK quickstarts use.

use std::str::FromStr;

use lfx_core::{AccountId, NodeId};
use lfx_crypto::Ed25519KeyPair;
use serde::{Deserialize, Serialize};

/// Account number the sandbox assigns its operator.
pub const SANDBOX_OPERATOR: AccountId = AccountId::new(2);

/// Node used for freezing multi-party transactions unless overridden.
pub const DEFAULT_NODE: NodeId = NodeId::new(3);

/// Target ledger network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Previewnet,
    /// In-process sandbox ledger.
    Local,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Previewnet => "previewnet",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "previewnet" => Ok(Self::Previewnet),
            "local" | "sandbox" => Ok(Self::Local),
            other => Err(ConfigError::InvalidNetwork(other.to_string())),
        }
    }
}

/// Operator credentials and network selection.
///
/// Custom `Debug` implementation redacts the private key.
#[derive(Clone)]
pub struct LedgerConfig {
    pub network: Network,
    pub operator_account: AccountId,
    pub operator_key: Ed25519KeyPair,
    /// Node multi-party transactions are frozen against.
    pub node: NodeId,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("network", &self.network)
            .field("operator_account", &self.operator_account)
            .field("operator_key", &"[REDACTED]")
            .field("node", &self.node)
            .finish()
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MY_ACCOUNT_ID` (required, `shard.realm.num`)
    /// - `MY_PRIVATE_KEY` (required, hex Ed25519 seed, raw or DER-prefixed)
    /// - `LFX_NETWORK` (default: `testnet`)
    /// - `LFX_NODE_ACCOUNT` (default: `0.0.3`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account_raw = lookup("MY_ACCOUNT_ID").ok_or(ConfigError::MissingVar("MY_ACCOUNT_ID"))?;
        let operator_account = account_raw.parse().map_err(|e: lfx_core::IdError| {
            ConfigError::InvalidValue {
                var: "MY_ACCOUNT_ID",
                reason: e.to_string(),
            }
        })?;

        let key_raw = lookup("MY_PRIVATE_KEY").ok_or(ConfigError::MissingVar("MY_PRIVATE_KEY"))?;
        let operator_key = Ed25519KeyPair::from_hex(&key_raw).map_err(|e| ConfigError::InvalidValue {
            var: "MY_PRIVATE_KEY",
            reason: e.to_string(),
        })?;

        let network = match lookup("LFX_NETWORK") {
            Some(raw) => raw.parse()?,
            None => Network::Testnet,
        };

        let node = match lookup("LFX_NODE_ACCOUNT") {
            Some(raw) => raw.parse().map_err(|e: lfx_core::IdError| ConfigError::InvalidValue {
                var: "LFX_NODE_ACCOUNT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_NODE,
        };

        Ok(Self {
            network,
            operator_account,
            operator_key,
            node,
        })
    }

    /// A local configuration with a freshly generated operator key.
    pub fn sandbox() -> Self {
        Self {
            network: Network::Local,
            operator_account: SANDBOX_OPERATOR,
            operator_key: Ed25519KeyPair::generate(),
            node: DEFAULT_NODE,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
    #[error("unknown network {0:?} (expected mainnet, testnet, previewnet or local)")]
    InvalidNetwork(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SEED_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn loads_required_and_defaults() {
        let cfg = LedgerConfig::from_lookup(lookup(&[
            ("MY_ACCOUNT_ID", "0.0.4521"),
            ("MY_PRIVATE_KEY", SEED_HEX),
        ]))
        .unwrap();
        assert_eq!(cfg.operator_account, AccountId::new(4521));
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.node, DEFAULT_NODE);
        assert_eq!(
            cfg.operator_key.public_key(),
            Ed25519KeyPair::from_seed(&[1; 32]).public_key()
        );
    }

    #[test]
    fn der_prefixed_key_is_accepted() {
        let der = format!("302e020100300506032b657004220420{SEED_HEX}");
        let cfg = LedgerConfig::from_lookup(lookup(&[
            ("MY_ACCOUNT_ID", "0.0.4521"),
            ("MY_PRIVATE_KEY", &der),
            ("LFX_NETWORK", "previewnet"),
            ("LFX_NODE_ACCOUNT", "0.0.7"),
        ]))
        .unwrap();
        assert_eq!(cfg.network, Network::Previewnet);
        assert_eq!(cfg.node, NodeId::new(7));
    }

    #[test]
    fn missing_credentials_are_reported() {
        let err = LedgerConfig::from_lookup(lookup(&[("MY_PRIVATE_KEY", SEED_HEX)])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("MY_ACCOUNT_ID"));
        let err = LedgerConfig::from_lookup(lookup(&[("MY_ACCOUNT_ID", "0.0.1")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("MY_PRIVATE_KEY"));
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = LedgerConfig::from_lookup(lookup(&[
            ("MY_ACCOUNT_ID", "not-an-account"),
            ("MY_PRIVATE_KEY", SEED_HEX),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "MY_ACCOUNT_ID", .. }));

        let err = LedgerConfig::from_lookup(lookup(&[
            ("MY_ACCOUNT_ID", "0.0.1"),
            ("MY_PRIVATE_KEY", SEED_HEX),
            ("LFX_NETWORK", "moon"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidNetwork("moon".to_string()));
    }

    #[test]
    fn debug_redacts_private_key() {
        let cfg = LedgerConfig::sandbox();
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("Local"));
    }
}
