//! # Scenario Catalogue
//!
//! End-to-end flows over the fixtures. Each scenario creates the token or
//! topic it needs, so scenarios run in any order against one context.
//!
//! A scenario returns a `ScenarioReport` listing the steps it took and what
//! it observed. A step whose observation differs from the expected one
//! fails the scenario with `CheckFailed`.

use std::fmt;
use std::str::FromStr;

use lfx_crypto::KeyPolicy;
use lfx_ledger::{Asset, ReceiptStatus};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::context::FixtureContext;
use crate::error::FixtureError;
use crate::token::{MintExpectation, MintOutcome, TokenSpec};

pub const TOKEN_NAME: &str = "Test Token";
pub const TOKEN_SYMBOL: &str = "HTT";
pub const TOKEN_SUPPLY: u64 = 1000;
pub const TOPIC_MEMO: &str = "Taxi rides";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Create, inspect and mint a token; a capped token refuses to mint.
    TokenService,
    /// Publish to single-key and threshold-key topics and read back.
    Consensus,
    /// Two payers, two payees, four signatures.
    MultiParty,
    /// One actor pays another and submits the transfer itself.
    TokenTransfer,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Self::TokenService,
        Self::Consensus,
        Self::MultiParty,
        Self::TokenTransfer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::TokenService => "token_service",
            Self::Consensus => "consensus",
            Self::MultiParty => "multi_party",
            Self::TokenTransfer => "token_transfer",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognised scenario name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scenario {0:?} (expected token_service, consensus, multi_party or token_transfer)")]
pub struct UnknownScenario(pub String);

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == normalized)
            .ok_or_else(|| UnknownScenario(s.to_string()))
    }
}

/// One step of a scenario and what it observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub description: String,
    pub observed: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub steps: Vec<Step>,
}

impl ScenarioReport {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            steps: Vec::new(),
        }
    }

    fn step(&mut self, description: impl Into<String>, observed: Value) {
        let description = description.into();
        tracing::info!(scenario = %self.scenario, step = %description, %observed, "step");
        self.steps.push(Step {
            description,
            observed,
        });
    }
}

fn check<T: PartialEq + fmt::Debug>(what: &str, actual: T, expected: T) -> Result<(), FixtureError> {
    if actual == expected {
        Ok(())
    } else {
        Err(FixtureError::CheckFailed(format!(
            "{what}: observed {actual:?}, expected {expected:?}"
        )))
    }
}

/// Run `scenario` against `ctx`.
pub async fn run(ctx: &FixtureContext, scenario: Scenario) -> Result<ScenarioReport, FixtureError> {
    let span = tracing::info_span!("scenario", name = %scenario);
    async move {
        let report = match scenario {
            Scenario::TokenService => token_service(ctx).await,
            Scenario::Consensus => consensus(ctx).await,
            Scenario::MultiParty => multi_party(ctx).await,
            Scenario::TokenTransfer => token_transfer(ctx).await,
        };
        match &report {
            Ok(report) => tracing::info!(steps = report.steps.len(), "scenario passed"),
            Err(err) => tracing::error!(error = %err, "scenario failed"),
        }
        report
    }
    .instrument(span)
    .await
}

async fn token_service(ctx: &FixtureContext) -> Result<ScenarioReport, FixtureError> {
    let mut report = ScenarioReport::new(Scenario::TokenService);
    let token = ctx.token();

    let asset = token
        .create(&TokenSpec::new(TOKEN_NAME, TOKEN_SYMBOL, TOKEN_SUPPLY))
        .await?;
    report.step("create token", json!({ "asset": asset.to_string() }));

    let info = token.info().await?;
    check("name", info.name.as_str(), TOKEN_NAME)?;
    check("symbol", info.symbol.as_str(), TOKEN_SYMBOL)?;
    check("decimals", info.decimals, 0)?;
    let admin = ctx.registry().admin()?;
    check("admin key", info.admin_key, Some(admin.public_key()))?;
    check("total supply", info.total_supply, TOKEN_SUPPLY)?;
    report.step(
        "inspect token",
        json!({
            "name": info.name,
            "symbol": info.symbol,
            "decimals": info.decimals,
            "total_supply": info.total_supply,
        }),
    );

    let minted = token.mint(500, MintExpectation::Success).await?;
    check(
        "mint",
        minted,
        MintOutcome::Minted {
            before: TOKEN_SUPPLY,
            after: TOKEN_SUPPLY + 500,
        },
    )?;
    report.step("mint 500", serde_json::to_value(minted).unwrap_or(Value::Null));

    let capped = token
        .create(&TokenSpec::new(TOKEN_NAME, TOKEN_SYMBOL, TOKEN_SUPPLY).fixed())
        .await?;
    report.step("create fixed supply token", json!({ "asset": capped.to_string() }));

    let refused = token.mint(10_000, MintExpectation::Rejection).await?;
    check(
        "capped mint",
        refused,
        MintOutcome::Rejected {
            status: ReceiptStatus::TokenMaxSupplyReached,
        },
    )?;
    check("total supply after refused mint", token.total_supply().await?, TOKEN_SUPPLY)?;
    report.step("mint beyond cap", serde_json::to_value(refused).unwrap_or(Value::Null));

    Ok(report)
}

async fn consensus(ctx: &FixtureContext) -> Result<ScenarioReport, FixtureError> {
    let mut report = ScenarioReport::new(Scenario::Consensus);
    let topic = ctx.topic();

    let first = ctx.resolve("first").await?;
    let id = topic
        .create(TOPIC_MEMO, Some(KeyPolicy::Single(first.public_key())))
        .await?;
    report.step("create single-key topic", json!({ "topic": id.to_string() }));

    let published = topic.publish("Main Street", "first").await?;
    report.step(
        "publish as first",
        json!({ "sequence": published.topic_sequence_number }),
    );
    let message = topic.subscribe_once()?.received().await?;
    check("received message", message.contents_lossy().as_str(), "Main Street")?;
    report.step("receive", json!({ "message": message.contents_lossy() }));

    let policy = topic.threshold_key(&["first", "second"], 2).await?;
    let id = topic.create(TOPIC_MEMO, Some(policy)).await?;
    report.step("create 2-of-2 threshold topic", json!({ "topic": id.to_string() }));

    let status = match topic.publish("Elm Street", "first").await {
        Ok(_) => return Err(FixtureError::UnexpectedSuccess { operation: "topic message" }),
        Err(err) => err.status(),
    };
    check("single signer publish", status, Some(ReceiptStatus::InvalidSignature))?;
    report.step("publish with one signature", json!({ "status": status }));

    let pending = topic.subscribe_once()?;
    let published = topic.publish_cosigned("Elm Street", "first", &["second"]).await?;
    report.step(
        "publish with two signatures",
        json!({ "sequence": published.topic_sequence_number }),
    );
    let message = pending.received().await?;
    check("received message", message.contents_lossy().as_str(), "Elm Street")?;
    report.step("receive", json!({ "message": message.contents_lossy() }));

    Ok(report)
}

async fn multi_party(ctx: &FixtureContext) -> Result<ScenarioReport, FixtureError> {
    let mut report = ScenarioReport::new(Scenario::MultiParty);
    let token = ctx.token();
    let asset = token
        .create(&TokenSpec::new(TOKEN_NAME, TOKEN_SYMBOL, TOKEN_SUPPLY))
        .await?;

    for (actor, held) in [("first", 10), ("second", 10), ("third", 0), ("fourth", 0)] {
        token.ensure_balance(actor, held).await?;
    }
    report.step(
        "fund parties",
        json!({ "first": 10, "second": 10, "third": 0, "fourth": 0 }),
    );

    let parties = ctx.resolve_many(&["first", "second", "third", "fourth"]).await?;
    let [first, second, third, fourth] = parties.as_slice() else {
        return Err(FixtureError::CheckFailed("expected four parties".into()));
    };
    let asset = Asset::Token(asset);
    let mut builder = ctx.multi_party();
    builder
        .debit(asset, first, 5)?
        .debit(asset, second, 5)?
        .credit(asset, third, 3)?
        .credit(asset, fourth, 7)?;
    let mut transfer = builder.build(ctx.node()).await?;
    for party in [first, second, third, fourth] {
        transfer.add_signature(party)?;
    }
    report.step(
        "freeze and sign",
        json!({
            "transaction": transfer.transaction_id().to_string(),
            "node": ctx.node().to_string(),
            "signatures": transfer.signatures().len(),
        }),
    );

    let status = transfer.submit().await?;
    report.step("submit", json!({ "status": status }));

    for (actor, expected) in [("first", 5), ("second", 5), ("third", 3), ("fourth", 7)] {
        check(actor, token.balance(actor).await?.held(), Some(expected))?;
    }
    report.step(
        "settled balances",
        json!({ "first": 5, "second": 5, "third": 3, "fourth": 7 }),
    );
    Ok(report)
}

async fn token_transfer(ctx: &FixtureContext) -> Result<ScenarioReport, FixtureError> {
    let mut report = ScenarioReport::new(Scenario::TokenTransfer);
    let token = ctx.token();
    let asset = token
        .create(&TokenSpec::new(TOKEN_NAME, TOKEN_SYMBOL, TOKEN_SUPPLY))
        .await?;
    token.ensure_balance("first", 10).await?;
    token.ensure_balance("second", 0).await?;
    report.step("fund parties", json!({ "first": 10, "second": 0 }));

    let first = ctx.resolve("first").await?;
    let second = ctx.resolve("second").await?;
    let mut builder = ctx.multi_party();
    builder
        .transfer(Asset::Token(asset), &first, &second, 10)?
        .payer(&first);
    let mut transfer = builder.build(ctx.node()).await?;
    transfer.add_signature(&first)?;
    check("payer", transfer.transaction_id().payer, first.account())?;
    report.step(
        "first creates transfer of 10",
        json!({ "transaction": transfer.transaction_id().to_string() }),
    );

    let status = transfer.submit().await?;
    report.step("first submits", json!({ "status": status }));

    check("first balance", token.balance("first").await?.held(), Some(0))?;
    check("second balance", token.balance("second").await?.held(), Some(10))?;
    report.step("settled balances", json!({ "first": 0, "second": 10 }));
    Ok(report)
}
