//! # Scenario Catalogue Tests
//!
//! Runs every catalogue scenario against a fresh sandbox, plus the token
//! and topic checks the scenarios are built from.

mod common;

use std::time::Duration;

use lfx_crypto::KeyPolicy;
use lfx_fixtures::scenarios::{self, Scenario};
use lfx_fixtures::{
    FixtureConfig, FixtureContext, FixtureError, FixtureKind, MintExpectation, MintOutcome,
    TokenField, TokenFieldValue, TokenSpec,
};
use lfx_ledger::{LedgerError, ReceiptStatus};

use common::{probed, sandbox, StreamFault};

#[tokio::test]
async fn every_scenario_passes_on_its_own() {
    for scenario in Scenario::ALL {
        let (ctx, _ledger) = sandbox();
        let report = scenarios::run(&ctx, scenario)
            .await
            .unwrap_or_else(|err| panic!("{scenario} failed: {err}"));
        assert_eq!(report.scenario, scenario);
        assert!(!report.steps.is_empty());
    }
}

#[tokio::test]
async fn scenarios_share_one_context() {
    let (ctx, _ledger) = sandbox();
    for scenario in Scenario::ALL {
        scenarios::run(&ctx, scenario).await.unwrap();
    }
    assert_eq!(ctx.registry().bootstrap_runs(), 1);
}

#[tokio::test]
async fn report_serializes_with_scenario_name() {
    let (ctx, _ledger) = sandbox();
    let report = scenarios::run(&ctx, Scenario::TokenTransfer).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["scenario"], "token_transfer");
    assert!(json["steps"][0]["description"].is_string());
}

#[tokio::test]
async fn created_token_reports_its_fields() {
    let (ctx, _ledger) = sandbox();
    let token = ctx.token();
    token.create(&TokenSpec::new("Test Token", "HTT", 1000)).await.unwrap();
    let admin = ctx.registry().admin().unwrap();

    assert_eq!(token.query(TokenField::TotalSupply).await.unwrap(), TokenFieldValue::TotalSupply(1000));
    assert_eq!(token.query(TokenField::Decimals).await.unwrap(), TokenFieldValue::Decimals(0));
    assert_eq!(token.name().await.unwrap(), "Test Token");
    assert_eq!(token.symbol().await.unwrap(), "HTT");
    assert_eq!(token.admin_key().await.unwrap(), Some(admin.public_key()));
}

#[tokio::test]
async fn uncapped_mint_adds_to_supply_and_capped_mint_is_refused() {
    let (ctx, _ledger) = sandbox();
    let token = ctx.token();
    token.create(&TokenSpec::new("Test Token", "HTT", 1000)).await.unwrap();
    assert_eq!(
        token.mint(500, MintExpectation::Success).await.unwrap(),
        MintOutcome::Minted { before: 1000, after: 1500 }
    );

    token.create(&TokenSpec::new("Test Token", "HTT", 1000).fixed()).await.unwrap();
    let err = token.mint(10_000, MintExpectation::Success).await.unwrap_err();
    assert_eq!(err.status(), Some(ReceiptStatus::TokenMaxSupplyReached));
    assert_eq!(
        token.mint(10_000, MintExpectation::Rejection).await.unwrap(),
        MintOutcome::Rejected { status: ReceiptStatus::TokenMaxSupplyReached }
    );
    assert_eq!(token.total_supply().await.unwrap(), 1000);
}

#[tokio::test]
async fn mint_expected_to_fail_that_succeeds_is_an_error() {
    let (ctx, _ledger) = sandbox();
    let token = ctx.token();
    token.create(&TokenSpec::new("Test Token", "HTT", 1000)).await.unwrap();
    let err = token.mint(1, MintExpectation::Rejection).await.unwrap_err();
    assert!(matches!(err, FixtureError::UnexpectedSuccess { operation: "mint" }));
}

#[tokio::test]
async fn fixtures_refuse_use_before_creation() {
    let (ctx, _ledger) = sandbox();
    let err = ctx.token().mint(1, MintExpectation::Success).await.unwrap_err();
    assert!(matches!(err, FixtureError::AssetNotInitialized { kind: FixtureKind::Token }));
    let err = ctx.topic().publish("hello", "first").await.unwrap_err();
    assert!(matches!(err, FixtureError::AssetNotInitialized { kind: FixtureKind::Topic }));
    assert!(ctx.topic().subscribe_once().is_err());
}

#[tokio::test]
async fn single_signature_on_two_of_two_topic_is_rejected() {
    let (ctx, _ledger) = sandbox();
    let topic = ctx.topic();
    let policy = topic.threshold_key(&["first", "second"], 2).await.unwrap();
    topic.create("Taxi rides", Some(policy)).await.unwrap();

    let err = topic.publish("Main Street", "first").await.unwrap_err();
    assert_eq!(err.status(), Some(ReceiptStatus::InvalidSignature));
    topic
        .publish_cosigned("Main Street", "first", &["second"])
        .await
        .unwrap();
}

#[tokio::test]
async fn threshold_above_member_count_is_invalid() {
    let (ctx, _ledger) = sandbox();
    let err = ctx.topic().threshold_key(&["first", "second"], 3).await.unwrap_err();
    assert!(matches!(err, FixtureError::InvalidThreshold(_)));
}

#[tokio::test]
async fn open_topic_accepts_any_publisher() {
    let (ctx, _ledger) = sandbox();
    let topic = ctx.topic();
    topic.create("Taxi rides", None).await.unwrap();
    let receipt = topic.publish("Main Street", "fourth").await.unwrap();
    assert_eq!(receipt.topic_sequence_number, Some(1));
}

#[tokio::test(start_paused = true)]
async fn listener_waits_for_the_mirror_before_subscribing() {
    let config = FixtureConfig {
        mirror_delay: Duration::from_secs(5),
        ..FixtureConfig::for_sandbox()
    };
    let (ctx, _ledger) = FixtureContext::sandbox_with(config).unwrap();
    let topic = ctx.topic();
    let first = ctx.resolve("first").await.unwrap();
    topic
        .create("Taxi rides", Some(KeyPolicy::Single(first.public_key())))
        .await
        .unwrap();

    let pending = topic.subscribe_once().unwrap();
    tokio::task::yield_now().await;
    assert!(!pending.is_finished());

    topic.publish("Main Street", "first").await.unwrap();
    let message = pending.received().await.unwrap();
    assert_eq!(message.contents_lossy(), "Main Street");
    assert_eq!(message.sequence_number, 1);
}

#[tokio::test]
async fn subscription_error_ends_the_listener() {
    let (ctx, probe, _ledger) = probed();
    ctx.topic().create("Taxi rides", None).await.unwrap();
    probe.break_subscriptions(StreamFault::Error(LedgerError::Transport(
        "mirror connection reset".to_string(),
    )));

    let err = ctx.topic().subscribe_once().unwrap().received().await.unwrap_err();
    match err {
        FixtureError::Subscription(reason) => assert!(reason.contains("mirror connection reset")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn stream_ending_without_a_message_ends_the_listener() {
    let (ctx, probe, _ledger) = probed();
    let topic = ctx.topic().create("Taxi rides", None).await.unwrap();
    probe.break_subscriptions(StreamFault::Closed);

    let err = ctx.topic().subscribe_once().unwrap().received().await.unwrap_err();
    match err {
        FixtureError::Subscription(reason) => {
            assert!(reason.contains(&topic.to_string()));
            assert!(reason.contains("ended before a message"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
