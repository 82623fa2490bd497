//! # Config Subcommand
//!
//! Prints the ledger and fixture configuration the environment resolves to.
//! The operator key is never printed.

use anyhow::Context;
use clap::Args;
use lfx_fixtures::FixtureConfig;
use lfx_ledger::LedgerConfig;
use serde::Serialize;

/// Arguments for the config subcommand.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the sandbox defaults instead of reading operator credentials.
    #[arg(long)]
    pub sandbox: bool,
}

/// Configuration as printed.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub network: String,
    pub operator_account: String,
    pub operator_key: &'static str,
    pub node: String,
    pub mirror_delay_ms: u128,
    pub bootstrap: Vec<BootstrapEntry>,
}

#[derive(Debug, Serialize)]
pub struct BootstrapEntry {
    pub actor: String,
    pub balance: u64,
}

impl ConfigReport {
    pub fn new(ledger: &LedgerConfig, fixtures: &FixtureConfig) -> Self {
        Self {
            network: ledger.network.to_string(),
            operator_account: ledger.operator_account.to_string(),
            operator_key: "<redacted>",
            node: fixtures.node_for(ledger).to_string(),
            mirror_delay_ms: fixtures.mirror_delay.as_millis(),
            bootstrap: fixtures
                .bootstrap
                .iter()
                .map(|(actor, balance)| BootstrapEntry {
                    actor: actor.to_string(),
                    balance: *balance,
                })
                .collect(),
        }
    }
}

/// Resolve configuration from the environment, or the sandbox defaults.
pub fn run(args: &ConfigArgs) -> anyhow::Result<ConfigReport> {
    let (ledger, fixtures) = if args.sandbox {
        (LedgerConfig::sandbox(), FixtureConfig::for_sandbox())
    } else {
        let ledger = LedgerConfig::from_env().context("loading operator credentials")?;
        let fixtures = FixtureConfig::from_env().context("loading fixture settings")?;
        (ledger, fixtures)
    };
    Ok(ConfigReport::new(&ledger, &fixtures))
}
