//! # lfx CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Ledger fixtures: named actors, balances, tokens, topics and multi-party
/// transfers for scenario tests.
#[derive(Parser, Debug)]
#[command(name = "lfx", version, about)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run catalogue scenarios against a sandbox ledger.
    Scenario(lfx_cli::scenario::ScenarioArgs),
    /// Print the resolved configuration.
    Config(lfx_cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match &cli.command {
        Commands::Scenario(args) => {
            let reports = lfx_cli::scenario::run(args).await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Commands::Config(args) => {
            let report = lfx_cli::config::run(args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
