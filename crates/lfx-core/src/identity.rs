//! # Ledger Identifier Newtypes
//!
//! Newtype wrappers for every ledger entity the fixtures touch. An
//! `AssetId` cannot be passed where an `AccountId` is expected, even though
//! both render as `shard.realm.num`.
//!
//! Entity ids serialize as their dotted string form so that canonical
//! transaction bodies read the same way the network prints them.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IdError;

/// Declares a `shard.realm.num` entity identifier with parsing, display and
/// string serde.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            /// Shard number.
            pub shard: u64,
            /// Realm number.
            pub realm: u64,
            /// Entity number within the realm.
            pub num: u64,
        }

        impl $name {
            /// Entity in shard 0, realm 0.
            pub const fn new(num: u64) -> Self {
                Self { shard: 0, realm: 0, num }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (shard, realm, num) = parse_entity(s).ok_or_else(|| IdError::MalformedEntity {
                    kind: $kind,
                    input: s.to_string(),
                })?;
                Ok(Self { shard, realm, num })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

entity_id!(
    /// A ledger account.
    AccountId,
    "account"
);

entity_id!(
    /// A fungible asset (token) tracked ledger-wide.
    AssetId,
    "asset"
);

entity_id!(
    /// A publish/subscribe topic.
    TopicId,
    "topic"
);

entity_id!(
    /// A consensus node. Frozen transactions target exactly one node.
    NodeId,
    "node"
);

fn parse_entity(s: &str) -> Option<(u64, u64, u64)> {
    let mut parts = s.trim().split('.');
    let shard = parts.next()?.parse().ok()?;
    let realm = parts.next()?.parse().ok()?;
    let num = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((shard, realm, num))
}

/// Logical name of a fixture actor, e.g. `"admin"`, `"treasury"`, `"first"`.
///
/// Non-empty, no whitespace. Borrows as `str` so maps keyed by name can be
/// queried with plain string slices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorName(String);

impl ActorName {
    /// The operator actor, seeded from external credentials.
    pub const ADMIN: &'static str = "admin";
    /// The funding actor for asset balances and asset treasury.
    pub const TREASURY: &'static str = "treasury";

    /// Validate and wrap a name.
    pub fn new(name: impl Into<String>) -> Result<Self, IdError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidActorName(name));
        }
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ActorName {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActorName> for String {
    fn from(value: ActorName) -> Self {
        value.0
    }
}

impl Borrow<str> for ActorName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transaction identifier: the paying account plus the valid-start instant.
///
/// Rendered as `payer@seconds.nanos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId {
    /// Account paying for the transaction.
    pub payer: AccountId,
    /// Start of the validity window.
    pub valid_start: DateTime<Utc>,
}

impl TransactionId {
    /// Build a transaction id for `payer` starting at `valid_start`.
    pub fn new(payer: AccountId, valid_start: DateTime<Utc>) -> Self {
        Self { payer, valid_start }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.payer,
            self.valid_start.timestamp(),
            self.valid_start.timestamp_subsec_nanos()
        )
    }
}

impl FromStr for TransactionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IdError::MalformedTransaction(s.to_string());
        let (payer, instant) = s.split_once('@').ok_or_else(malformed)?;
        let payer: AccountId = payer.parse().map_err(|_| malformed())?;
        let (secs, nanos) = instant.split_once('.').ok_or_else(malformed)?;
        let secs: i64 = secs.parse().map_err(|_| malformed())?;
        let nanos: u32 = nanos.parse().map_err(|_| malformed())?;
        let valid_start = Utc.timestamp_opt(secs, nanos).single().ok_or_else(malformed)?;
        Ok(Self { payer, valid_start })
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
