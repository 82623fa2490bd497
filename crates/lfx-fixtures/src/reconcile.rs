//! # Balance Reconciliation
//!
//! Brings one account's balance of one asset to a target with at most one
//! transfer against a funding actor.
//!
//! The transfer direction is explicit. Raising the balance moves funds from
//! the funding actor, which signs. Lowering it moves funds back from the
//! account, which signs. The source of a transfer is always its signer.
//!
//! For tokens, an account that was never associated with the asset is
//! associated first (signed by the account) and treated as holding zero.

use std::sync::Arc;

use lfx_core::{AccountId, AssetId};
use lfx_ledger::{Asset, AssetBalance, LedgerClient, ReceiptStatus};
use serde::Serialize;

use crate::error::{ensure_success, FixtureError};
use crate::identity::Identity;

/// Which way a corrective transfer moves funds, relative to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Funding actor to account.
    Inbound,
    /// Account to funding actor.
    Outbound,
}

/// The corrective transfer needed to move `current` to `target`, if any.
pub fn plan_transfer(current: u64, target: u64) -> Option<(Direction, u64)> {
    match target.cmp(&current) {
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some((Direction::Inbound, target - current)),
        std::cmp::Ordering::Less => Some((Direction::Outbound, current - target)),
    }
}

/// A transfer that was executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub asset: Asset,
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: u64,
}

/// What a reconcile call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// An association transaction was issued.
    pub associated: bool,
    /// The corrective transfer, if the balance was off target.
    pub transfer: Option<Transfer>,
}

impl ReconcileOutcome {
    /// No ledger transaction was issued.
    pub fn is_noop(&self) -> bool {
        !self.associated && self.transfer.is_none()
    }
}

#[derive(Clone)]
pub struct BalanceReconciler {
    ledger: Arc<dyn LedgerClient>,
}

impl BalanceReconciler {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Bring `account`'s balance of `asset` to `target`, settling against
    /// `funding`.
    pub async fn reconcile(
        &self,
        asset: Asset,
        account: &Identity,
        target: u64,
        funding: &Identity,
    ) -> Result<ReconcileOutcome, FixtureError> {
        let mut outcome = ReconcileOutcome::default();
        let current = match asset {
            Asset::Native => self.ledger.native_balance(account.account()).await?,
            Asset::Token(id) => match self.ledger.asset_balance(account.account(), id).await? {
                AssetBalance::Held(held) => held,
                AssetBalance::NotAssociated => {
                    outcome.associated = self.associate(id, account).await?;
                    0
                }
            },
        };

        let Some((direction, amount)) = plan_transfer(current, target) else {
            tracing::debug!(actor = %account.name(), %asset, balance = current, "balance on target");
            return Ok(outcome);
        };
        if account.account() == funding.account() {
            return Err(FixtureError::SelfFunding {
                name: account.name().to_string(),
            });
        }

        let (source, destination) = match direction {
            Direction::Inbound => (funding, account),
            Direction::Outbound => (account, funding),
        };
        outcome.transfer = Some(self.transfer(asset, source, destination, amount).await?);
        Ok(outcome)
    }

    /// Move `amount` of `asset` from `source` to `destination`, signed by
    /// `source`.
    pub async fn transfer(
        &self,
        asset: Asset,
        source: &Identity,
        destination: &Identity,
        amount: u64,
    ) -> Result<Transfer, FixtureError> {
        let receipt = match asset {
            Asset::Native => {
                self.ledger
                    .transfer_native(source.account(), destination.account(), amount, source.key())
                    .await?
            }
            Asset::Token(id) => {
                self.ledger
                    .transfer_asset(id, source.account(), destination.account(), amount, source.key())
                    .await?
            }
        };
        tracing::info!(
            source = %source.account(),
            destination = %destination.account(),
            %asset,
            amount,
            status = %receipt.status,
            "corrective transfer"
        );
        ensure_success("transfer", receipt.status, || {
            format!(
                "{} -> {}, {amount} of {asset}",
                source.account(),
                destination.account()
            )
        })?;
        Ok(Transfer {
            asset,
            source: source.account(),
            destination: destination.account(),
            amount,
        })
    }

    /// Associate `account` with `asset`. Returns `false` if it already was.
    pub async fn associate(&self, asset: AssetId, account: &Identity) -> Result<bool, FixtureError> {
        let receipt = self
            .ledger
            .associate_asset(account.account(), asset, account.key())
            .await?;
        match receipt.status {
            ReceiptStatus::Success => {
                tracing::info!(account = %account.account(), %asset, "associated");
                Ok(true)
            }
            ReceiptStatus::TokenAlreadyAssociatedToAccount => {
                tracing::warn!(account = %account.account(), %asset, "already associated, ignoring");
                Ok(false)
            }
            status => Err(FixtureError::OperationRejected {
                operation: "association",
                status,
                context: format!("account {} with asset {asset}", account.account()),
            }),
        }
    }
}
