//! Fixture configuration: which actors bootstrap provisions, which node
//! multi-party transactions target, and how long to wait for the mirror
//! before subscribing to a topic.

use std::time::Duration;

use lfx_core::{ActorName, NodeId};
use lfx_ledger::{ConfigError, LedgerConfig};

/// Actors provisioned on first registry access, in order, with their
/// native balances. The funding actor comes first.
pub const DEFAULT_BOOTSTRAP: &[(&str, u64)] = &[
    ("treasury", 500),
    ("first", 10),
    ("second", 10),
    ("third", 10),
    ("fourth", 10),
];

/// Default wait between topic creation and subscription.
pub const DEFAULT_MIRROR_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    /// Ordered `(actor, native balance)` provisioning plan.
    pub bootstrap: Vec<(ActorName, u64)>,
    /// Node multi-party transactions are frozen against. `None` defers to
    /// the ledger configuration's node.
    pub node: Option<NodeId>,
    /// Wait before a subscription starts.
    pub mirror_delay: Duration,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            bootstrap: default_plan(),
            node: None,
            mirror_delay: DEFAULT_MIRROR_DELAY,
        }
    }
}

impl FixtureConfig {
    /// Defaults, with `LFX_MIRROR_DELAY_MS` overriding the mirror delay.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup("LFX_MIRROR_DELAY_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "LFX_MIRROR_DELAY_MS",
                reason: format!("expected milliseconds, got {raw:?}"),
            })?;
            config.mirror_delay = Duration::from_millis(ms);
        }
        Ok(config)
    }

    /// Defaults for the in-process sandbox: no mirror delay.
    pub fn for_sandbox() -> Self {
        Self {
            mirror_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Freeze multi-party transactions against `node` whatever the ledger
    /// configuration names.
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// The node multi-party transactions are frozen against under `ledger`.
    pub fn node_for(&self, ledger: &LedgerConfig) -> NodeId {
        self.node.unwrap_or(ledger.node)
    }
}

fn default_plan() -> Vec<(ActorName, u64)> {
    DEFAULT_BOOTSTRAP
        .iter()
        .filter_map(|(name, balance)| ActorName::new(*name).ok().map(|n| (n, *balance)))
        .collect()
}
