//! # Fixture Context
//!
//! One value per test run, passed to every step. It owns the registry and
//! both fixture managers, all sharing a single ledger client.

use std::sync::Arc;

use futures::future::try_join_all;
use lfx_core::NodeId;
use lfx_ledger::{LedgerClient, LedgerConfig, SandboxConfig, SandboxLedger};

use crate::config::FixtureConfig;
use crate::error::FixtureError;
use crate::identity::Identity;
use crate::multiparty::MultiPartyBuilder;
use crate::registry::Registry;
use crate::token::TokenFixture;
use crate::topic::TopicFixture;

pub struct FixtureContext {
    config: FixtureConfig,
    node: NodeId,
    registry: Registry,
    token: TokenFixture,
    topic: TopicFixture,
}

impl std::fmt::Debug for FixtureContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureContext")
            .field("config", &self.config)
            .field("node", &self.node)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl FixtureContext {
    /// A context freezing multi-party transfers against `node`.
    pub fn new(registry: Registry, config: FixtureConfig, node: NodeId) -> Self {
        Self {
            node,
            token: TokenFixture::new(registry.clone()),
            topic: TopicFixture::new(registry.clone(), config.mirror_delay),
            registry,
            config,
        }
    }

    /// A context over `ledger` whose `admin` is the configured operator.
    ///
    /// Multi-party transfers freeze against the fixture config's node if
    /// set, otherwise the ledger config's.
    pub fn from_config(
        ledger: Arc<dyn LedgerClient>,
        ledger_config: &LedgerConfig,
        config: FixtureConfig,
    ) -> Result<Self, FixtureError> {
        let registry = Registry::from_config(ledger, ledger_config, config.bootstrap.clone())?;
        let node = config.node_for(ledger_config);
        Ok(Self::new(registry, config, node))
    }

    /// A context over a fresh in-memory ledger. The ledger handle is
    /// returned for inspection and fault injection.
    pub fn sandbox() -> Result<(Self, SandboxLedger), FixtureError> {
        Self::sandbox_with(FixtureConfig::for_sandbox())
    }

    pub fn sandbox_with(config: FixtureConfig) -> Result<(Self, SandboxLedger), FixtureError> {
        let mut ledger_config = LedgerConfig::sandbox();
        ledger_config.node = config.node_for(&ledger_config);
        let sandbox = SandboxLedger::for_config(&ledger_config, SandboxConfig::default());
        let context = Self::from_config(Arc::new(sandbox.clone()), &ledger_config, config)?;
        Ok((context, sandbox))
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        self.registry.ledger()
    }

    pub fn token(&self) -> &TokenFixture {
        &self.token
    }

    pub fn topic(&self) -> &TopicFixture {
        &self.topic
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub async fn resolve(&self, name: &str) -> Result<Identity, FixtureError> {
        self.registry.resolve(name).await
    }

    /// Resolve several actors concurrently.
    pub async fn resolve_many(&self, names: &[&str]) -> Result<Vec<Identity>, FixtureError> {
        try_join_all(names.iter().map(|name| self.registry.resolve(name))).await
    }

    /// Ensure `name` holds exactly `target` native units.
    pub async fn ensure_balance(&self, name: &str, target: u64) -> Result<Identity, FixtureError> {
        self.registry.ensure_balance(name, target).await
    }

    /// Start assembling a multi-party transfer.
    pub fn multi_party(&self) -> MultiPartyBuilder {
        MultiPartyBuilder::new(Arc::clone(self.ledger()))
    }
}
