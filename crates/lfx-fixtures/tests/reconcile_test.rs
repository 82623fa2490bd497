//! # Balance Reconciliation Tests
//!
//! Signer direction, association before the first token transfer, and
//! idempotence, checked against the sandbox journal.

mod common;

use std::collections::BTreeSet;

use lfx_core::AccountId;
use lfx_fixtures::{Direction, FixtureError, TokenSpec};
use lfx_ledger::{Asset, LedgerClient, LedgerRecord, ReceiptStatus, TransactionKind, TransferLeg};
use proptest::prelude::*;

use common::sandbox;

fn last_transfer(records: Vec<LedgerRecord>) -> LedgerRecord {
    records.into_iter().last().expect("a transfer was journaled")
}

fn debited(record: &LedgerRecord) -> Vec<AccountId> {
    record
        .transfers
        .iter()
        .filter(|leg: &&TransferLeg| leg.amount < 0)
        .map(|leg| leg.account)
        .collect()
}

#[tokio::test]
async fn raising_a_balance_is_signed_by_the_funder() {
    let (ctx, ledger) = sandbox();
    let admin = ctx.registry().admin().unwrap();
    let first = ctx.ensure_balance("first", 60).await.unwrap();

    let record = last_transfer(ledger.records_of(TransactionKind::CryptoTransfer));
    assert_eq!(record.status, ReceiptStatus::Success);
    assert_eq!(record.signers, BTreeSet::from([admin.public_key()]));
    assert_eq!(debited(&record), vec![admin.account()]);
    assert_eq!(ledger.native_balance(first.account()).await.unwrap(), 60);
}

#[tokio::test]
async fn lowering_a_balance_is_signed_by_the_account() {
    let (ctx, ledger) = sandbox();
    let admin = ctx.registry().admin().unwrap();
    let first = ctx.ensure_balance("first", 4).await.unwrap();

    let record = last_transfer(ledger.records_of(TransactionKind::CryptoTransfer));
    assert_eq!(record.signers, BTreeSet::from([first.public_key()]));
    assert_eq!(debited(&record), vec![first.account()]);
    let credited: Vec<_> = record
        .transfers
        .iter()
        .filter(|leg| leg.amount > 0)
        .map(|leg| (leg.account, leg.amount))
        .collect();
    assert_eq!(credited, vec![(admin.account(), 6)]);
}

#[tokio::test]
async fn first_token_reconcile_associates_before_transferring() {
    let (ctx, ledger) = sandbox();
    let token = ctx.token();
    let asset = token.create(&TokenSpec::new("Test Token", "HTT", 1000)).await.unwrap();
    let third = ctx.resolve("third").await.unwrap();
    let treasury = ctx.resolve("treasury").await.unwrap();
    let before = ledger.journal().len();

    let outcome = token.ensure_balance("third", 5).await.unwrap();
    assert!(outcome.associated);
    let transfer = outcome.transfer.expect("a corrective transfer");
    assert_eq!(transfer.asset, Asset::Token(asset));
    assert_eq!((transfer.source, transfer.destination), (treasury.account(), third.account()));
    assert_eq!(transfer.amount, 5);

    let issued: Vec<_> = ledger.journal().split_off(before);
    let kinds: Vec<_> = issued.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![TransactionKind::TokenAssociate, TransactionKind::CryptoTransfer]);
    assert_eq!(issued[0].signers, BTreeSet::from([third.public_key()]));
    assert_eq!(issued[1].signers, BTreeSet::from([treasury.public_key()]));

    let again = token.ensure_balance("third", 5).await.unwrap();
    assert!(again.is_noop());
    assert_eq!(ledger.journal().len(), before + 2);
}

#[tokio::test]
async fn zero_then_fifty_issues_one_transfer_from_treasury() {
    let (ctx, ledger) = sandbox();
    let token = ctx.token();
    token.create(&TokenSpec::new("Test Token", "HTT", 1000)).await.unwrap();
    let treasury = ctx.resolve("treasury").await.unwrap();

    let zero = token.ensure_balance("second", 0).await.unwrap();
    assert!(zero.associated);
    assert!(zero.transfer.is_none());
    let transfers_before = ledger.records_of(TransactionKind::CryptoTransfer).len();

    token.ensure_balance("second", 50).await.unwrap();
    let transfers = ledger.records_of(TransactionKind::CryptoTransfer);
    assert_eq!(transfers.len(), transfers_before + 1);
    let record = last_transfer(transfers);
    assert_eq!(debited(&record), vec![treasury.account()]);
    assert_eq!(token.balance("second").await.unwrap().held(), Some(50));
}

#[tokio::test]
async fn reassociation_is_tolerated() {
    let (ctx, _ledger) = sandbox();
    let token = ctx.token();
    token.create(&TokenSpec::new("Test Token", "HTT", 1000)).await.unwrap();
    assert!(token.associate("fourth").await.unwrap());
    assert!(!token.associate("fourth").await.unwrap());
}

#[tokio::test]
async fn rejected_transfer_carries_accounts_and_amount() {
    let (ctx, ledger) = sandbox();
    let first = ctx.resolve("first").await.unwrap();
    ledger.fail_next(TransactionKind::CryptoTransfer, ReceiptStatus::InsufficientAccountBalance);

    let err = ctx.ensure_balance("first", 30).await.unwrap_err();
    assert_eq!(err.status(), Some(ReceiptStatus::InsufficientAccountBalance));
    let message = err.to_string();
    assert!(message.contains(&first.account().to_string()));
    assert!(message.contains("20 of native"));
}

#[tokio::test]
async fn reconciling_against_oneself_is_refused() {
    let (ctx, _ledger) = sandbox();
    let treasury = ctx.resolve("treasury").await.unwrap();
    let err = ctx
        .registry()
        .reconciler()
        .reconcile(Asset::Native, &treasury, 1, &treasury)
        .await
        .unwrap_err();
    assert!(matches!(err, FixtureError::SelfFunding { .. }));
}

#[test]
fn direction_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&Direction::Inbound).unwrap(), "\"inbound\"");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_target_sequence_converges_and_settles(targets in proptest::collection::vec(0u64..400, 1..5)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (ctx, ledger) = sandbox();
            for target in &targets {
                let first = ctx.ensure_balance("first", *target).await.unwrap();
                assert_eq!(ledger.native_balance(first.account()).await.unwrap(), *target);

                let journaled = ledger.journal().len();
                ctx.ensure_balance("first", *target).await.unwrap();
                assert_eq!(ledger.journal().len(), journaled);
            }
        });
    }
}
