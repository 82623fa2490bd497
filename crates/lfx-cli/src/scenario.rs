//! # Scenario Subcommand
//!
//! Runs one catalogue scenario, or all of them, each against its own
//! sandbox ledger.

use std::str::FromStr;

use anyhow::Context;
use clap::Args;
use lfx_fixtures::scenarios::{self, Scenario, UnknownScenario};
use lfx_fixtures::{FixtureConfig, FixtureContext, ScenarioReport};

/// Which scenarios to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    One(Scenario),
}

impl Selection {
    pub fn scenarios(self) -> Vec<Scenario> {
        match self {
            Self::All => Scenario::ALL.to_vec(),
            Self::One(scenario) => vec![scenario],
        }
    }
}

impl FromStr for Selection {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::One)
        }
    }
}

/// Arguments for the scenario subcommand.
#[derive(Args, Debug)]
pub struct ScenarioArgs {
    /// Scenario name (token_service, consensus, multi_party, token_transfer) or `all`.
    #[arg(default_value = "all")]
    pub selection: Selection,

    /// Wait before subscribing to a topic, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub mirror_delay_ms: u64,

    /// Stop at the first failing scenario.
    #[arg(long)]
    pub fail_fast: bool,
}

/// Run the selected scenarios. Fails if any scenario failed.
pub async fn run(args: &ScenarioArgs) -> anyhow::Result<Vec<ScenarioReport>> {
    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for scenario in args.selection.scenarios() {
        let config = FixtureConfig {
            mirror_delay: std::time::Duration::from_millis(args.mirror_delay_ms),
            ..FixtureConfig::for_sandbox()
        };
        let (ctx, _ledger) = FixtureContext::sandbox_with(config)
            .with_context(|| format!("building sandbox for {scenario}"))?;
        match scenarios::run(&ctx, scenario).await {
            Ok(report) => reports.push(report),
            Err(err) => {
                tracing::error!(%scenario, error = %err, "scenario failed");
                failures.push(format!("{scenario}: {err}"));
                if args.fail_fast {
                    break;
                }
            }
        }
    }
    if !failures.is_empty() {
        anyhow::bail!("{} scenario(s) failed:\n  {}", failures.len(), failures.join("\n  "));
    }
    Ok(reports)
}
