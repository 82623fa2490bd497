//! # Registry Bootstrap Tests
//!
//! Single-flight bootstrap under concurrent access, retry after a failed
//! bootstrap, and idempotent balance provisioning.

mod common;

use futures::future::{join, join_all};
use lfx_fixtures::FixtureError;
use lfx_ledger::{LedgerClient, ReceiptStatus, TransactionKind};

use common::{probed, sandbox, successes};

const POOL: [&str; 5] = ["treasury", "first", "second", "third", "fourth"];

#[tokio::test]
async fn admin_is_available_before_bootstrap() {
    let (ctx, ledger) = sandbox();
    let admin = ctx.registry().admin().unwrap();
    assert_eq!(admin.account(), ctx.ledger().operator());
    assert!(!ctx.registry().is_ready());
    assert_eq!(ledger.account_count(), 1);
}

#[tokio::test]
async fn first_resolve_provisions_the_pool_with_default_balances() {
    let (ctx, ledger) = sandbox();
    let treasury = ctx.resolve("treasury").await.unwrap();

    assert!(ctx.registry().is_ready());
    assert_eq!(ledger.native_balance(treasury.account()).await.unwrap(), 500);
    for name in &POOL[1..] {
        let actor = ctx.resolve(name).await.unwrap();
        assert_eq!(ledger.native_balance(actor.account()).await.unwrap(), 10);
    }
    assert_eq!(successes(&ledger, TransactionKind::AccountCreate).len(), POOL.len());
    assert_eq!(ctx.registry().bootstrap_runs(), 1);
}

#[tokio::test]
async fn concurrent_resolves_share_one_bootstrap() {
    let (ctx, probe, ledger) = probed();

    let lookups = (0..8).map(|i| ctx.resolve(POOL[i % POOL.len()]));
    let resolved = join_all(lookups).await;

    assert!(resolved.iter().all(Result::is_ok));
    assert_eq!(ctx.registry().bootstrap_runs(), 1);
    assert_eq!(probe.creates(), POOL.len());
    assert_eq!(ledger.account_count(), POOL.len() + 1);
    assert_eq!(ctx.registry().identities().len(), POOL.len() + 1);
}

#[tokio::test]
async fn unknown_actor_is_reported_after_bootstrap() {
    let (ctx, _ledger) = sandbox();
    let err = ctx.resolve("fifth").await.unwrap_err();
    assert!(matches!(err, FixtureError::UnknownActor { ref name } if name == "fifth"));
    assert!(ctx.registry().is_ready());
}

#[tokio::test]
async fn failed_bootstrap_is_shared_and_retried() {
    let (ctx, probe, ledger) = probed();
    probe.fail_create_at(1);

    let results = join_all([ctx.resolve("first"), ctx.resolve("second")]).await;
    for result in &results {
        let err = result.as_ref().unwrap_err();
        assert!(matches!(err, FixtureError::BootstrapFailure { .. }));
        assert_eq!(err.status(), Some(ReceiptStatus::InsufficientAccountBalance));
    }
    assert!(!ctx.registry().is_ready());
    assert_eq!(ctx.registry().bootstrap_runs(), 1);

    ctx.resolve("first").await.unwrap();
    assert!(ctx.registry().is_ready());
    assert_eq!(ctx.registry().bootstrap_runs(), 2);
    assert_eq!(successes(&ledger, TransactionKind::AccountCreate).len(), POOL.len());
}

#[tokio::test]
async fn retry_after_partial_bootstrap_keeps_earlier_actors() {
    let (ctx, probe, ledger) = probed();
    probe.fail_create_at(3);

    ctx.resolve("treasury").await.unwrap_err();
    let registered = ctx.registry().identities();
    assert!(registered.contains_key("treasury"));
    assert!(registered.contains_key("first"));
    assert!(!registered.contains_key("second"));
    let treasury = registered["treasury"].clone();

    assert_eq!(ctx.resolve("treasury").await.unwrap(), treasury);
    assert_eq!(successes(&ledger, TransactionKind::AccountCreate).len(), POOL.len());
    assert!(successes(&ledger, TransactionKind::CryptoTransfer).is_empty());
}

#[tokio::test]
async fn ensure_balance_is_idempotent() {
    let (ctx, ledger) = sandbox();
    let first = ctx.ensure_balance("first", 50).await.unwrap();
    assert_eq!(ledger.native_balance(first.account()).await.unwrap(), 50);
    let transfers = ledger.records_of(TransactionKind::CryptoTransfer).len();
    assert_eq!(transfers, 1);

    ctx.ensure_balance("first", 50).await.unwrap();
    assert_eq!(ledger.records_of(TransactionKind::CryptoTransfer).len(), transfers);
    assert_eq!(ledger.journal().len(), POOL.len() + transfers);
}

#[tokio::test]
async fn ensure_balance_creates_unknown_actors_once() {
    let (ctx, ledger) = sandbox();
    let fifth = ctx.ensure_balance("fifth", 25).await.unwrap();
    assert_eq!(ledger.native_balance(fifth.account()).await.unwrap(), 25);
    assert_eq!(ctx.resolve("fifth").await.unwrap(), fifth);

    let again = ctx.ensure_balance("fifth", 25).await.unwrap();
    assert_eq!(again, fifth);
    assert_eq!(successes(&ledger, TransactionKind::AccountCreate).len(), POOL.len() + 1);
}

#[tokio::test]
async fn concurrent_ensure_balance_creates_one_account() {
    let (ctx, probe, ledger) = probed();
    ctx.resolve("first").await.unwrap();
    let before = probe.creates();

    let (a, b) = join(ctx.ensure_balance("fifth", 5), ctx.ensure_balance("fifth", 5)).await;
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a, b);
    assert_eq!(probe.creates(), before + 1);
    assert_eq!(successes(&ledger, TransactionKind::AccountCreate).len(), POOL.len() + 1);
    assert_eq!(ledger.native_balance(a.account()).await.unwrap(), 5);
    assert!(ledger.records_of(TransactionKind::CryptoTransfer).is_empty());
}

#[tokio::test]
async fn concurrent_ensure_balance_with_different_targets_settles_on_the_later() {
    let (ctx, probe, ledger) = probed();
    ctx.resolve("first").await.unwrap();
    let before = probe.creates();

    let (a, b) = join(ctx.ensure_balance("fifth", 5), ctx.ensure_balance("fifth", 8)).await;
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a, b);
    assert_eq!(probe.creates(), before + 1);
    assert_eq!(ledger.native_balance(a.account()).await.unwrap(), 8);
    assert_eq!(successes(&ledger, TransactionKind::CryptoTransfer).len(), 1);
}

#[tokio::test]
async fn rejected_account_creation_names_the_actor() {
    let (ctx, ledger) = sandbox();
    ctx.resolve("first").await.unwrap();
    ledger.fail_next(TransactionKind::AccountCreate, ReceiptStatus::InsufficientAccountBalance);

    let err = ctx.ensure_balance("fifth", 5).await.unwrap_err();
    assert_eq!(err.status(), Some(ReceiptStatus::InsufficientAccountBalance));
    assert!(err.to_string().contains("actor fifth"));
    assert!(ctx.resolve("fifth").await.is_err());
}
