//! # Multi-Party Transfers
//!
//! Assembles a transfer touching several accounts, freezes it against one
//! node so every party signs the same bytes, collects signatures, and
//! submits once every required key policy is satisfied.
//!
//! Required policies are derived from the transfer: each account with a net
//! debit must sign with its own key, as must an explicit payer. Callers may
//! add further policies, such as a threshold key over a group of actors.

use std::collections::BTreeMap;
use std::sync::Arc;

use lfx_core::{AccountId, NodeId, TransactionId};
use lfx_crypto::{Ed25519PublicKey, Ed25519Signature, KeyPolicy};
use lfx_ledger::{
    Asset, FrozenTransaction, LedgerClient, ReceiptStatus, SignatureMap, TransactionDraft,
};

use crate::error::{ensure_success, FixtureError};
use crate::identity::Identity;

/// A key policy the transfer cannot be submitted without.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredPolicy {
    /// Who the policy stands for, for error messages.
    pub label: String,
    pub policy: KeyPolicy,
}

/// Collects the legs of a multi-party transfer.
pub struct MultiPartyBuilder {
    ledger: Arc<dyn LedgerClient>,
    draft: TransactionDraft,
    parties: BTreeMap<AccountId, Identity>,
    payer: Option<Identity>,
    extra: Vec<RequiredPolicy>,
}

impl MultiPartyBuilder {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            draft: TransactionDraft::new(),
            parties: BTreeMap::new(),
            payer: None,
            extra: Vec::new(),
        }
    }

    /// Move `amount` of `asset` from `source` to `destination`.
    pub fn transfer(
        &mut self,
        asset: Asset,
        source: &Identity,
        destination: &Identity,
        amount: u64,
    ) -> Result<&mut Self, FixtureError> {
        self.draft
            .transfer(asset, source.account(), destination.account(), amount)?;
        self.party(source);
        self.party(destination);
        Ok(self)
    }

    /// Take `amount` of `asset` out of `account`.
    pub fn debit(
        &mut self,
        asset: Asset,
        account: &Identity,
        amount: u64,
    ) -> Result<&mut Self, FixtureError> {
        let amount = lfx_ledger::transaction::signed_amount(amount)?;
        self.draft.leg(asset, account.account(), -amount);
        self.party(account);
        Ok(self)
    }

    /// Put `amount` of `asset` into `account`.
    pub fn credit(
        &mut self,
        asset: Asset,
        account: &Identity,
        amount: u64,
    ) -> Result<&mut Self, FixtureError> {
        let amount = lfx_ledger::transaction::signed_amount(amount)?;
        self.draft.leg(asset, account.account(), amount);
        self.party(account);
        Ok(self)
    }

    /// Have `payer` pay for and submit the transaction.
    pub fn payer(&mut self, payer: &Identity) -> &mut Self {
        self.draft.payer = Some(payer.account());
        self.party(payer);
        self.payer = Some(payer.clone());
        self
    }

    /// Require `policy` in addition to the derived signers.
    pub fn require(&mut self, label: impl Into<String>, policy: KeyPolicy) -> &mut Self {
        self.extra.push(RequiredPolicy {
            label: label.into(),
            policy,
        });
        self
    }

    pub fn memo(&mut self, memo: impl Into<String>) -> &mut Self {
        self.draft.memo = Some(memo.into());
        self
    }

    fn party(&mut self, identity: &Identity) {
        self.parties
            .entry(identity.account())
            .or_insert_with(|| identity.clone());
    }

    /// Check every asset nets to zero and freeze against `node`.
    pub async fn build(&self, node: NodeId) -> Result<MultiPartyTransfer, FixtureError> {
        if let Some((asset, net)) = self
            .draft
            .net_by_asset()
            .into_iter()
            .find(|(_, net)| *net != 0)
        {
            return Err(FixtureError::Unbalanced { asset, net });
        }

        let mut required = Vec::new();
        let mut push = |label: String, policy: KeyPolicy| {
            if !required.iter().any(|r: &RequiredPolicy| r.policy == policy) {
                required.push(RequiredPolicy { label, policy });
            }
        };
        for account in self.draft.debited_accounts() {
            if let Some(identity) = self.parties.get(&account) {
                push(identity.to_string(), KeyPolicy::Single(identity.public_key()));
            }
        }
        if let Some(payer) = &self.payer {
            push(format!("payer {payer}"), KeyPolicy::Single(payer.public_key()));
        }
        for extra in &self.extra {
            push(extra.label.clone(), extra.policy.clone());
        }

        let frozen = self.ledger.freeze(&self.draft, node).await?;
        tracing::info!(
            transaction = %frozen.transaction_id(),
            %node,
            legs = frozen.body().transfers.len(),
            policies = required.len(),
            "multi-party transfer frozen"
        );
        Ok(MultiPartyTransfer {
            ledger: Arc::clone(&self.ledger),
            frozen,
            signatures: SignatureMap::new(),
            required,
            payer: self.payer.clone(),
        })
    }
}

/// A frozen multi-party transfer collecting signatures.
pub struct MultiPartyTransfer {
    ledger: Arc<dyn LedgerClient>,
    frozen: FrozenTransaction,
    signatures: SignatureMap,
    required: Vec<RequiredPolicy>,
    payer: Option<Identity>,
}

impl MultiPartyTransfer {
    pub fn builder(ledger: Arc<dyn LedgerClient>) -> MultiPartyBuilder {
        MultiPartyBuilder::new(ledger)
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.frozen.transaction_id()
    }

    pub fn frozen(&self) -> &FrozenTransaction {
        &self.frozen
    }

    pub fn required(&self) -> &[RequiredPolicy] {
        &self.required
    }

    pub fn signatures(&self) -> &SignatureMap {
        &self.signatures
    }

    /// Sign as `actor`. Returns `false` if the actor had already signed.
    pub fn add_signature(&mut self, actor: &Identity) -> Result<bool, FixtureError> {
        let signature = self.frozen.sign(actor.key());
        let added = self.signatures.insert(actor.public_key(), signature)?;
        tracing::debug!(
            transaction = %self.frozen.transaction_id(),
            signer = %actor,
            added,
            "signature attached"
        );
        Ok(added)
    }

    /// Attach a signature produced elsewhere, after checking it against the
    /// frozen bytes.
    pub fn attach(
        &mut self,
        public_key: Ed25519PublicKey,
        signature: Ed25519Signature,
    ) -> Result<bool, FixtureError> {
        lfx_crypto::verify(self.frozen.bytes(), &signature, &public_key)?;
        Ok(self.signatures.insert(public_key, signature)?)
    }

    /// The first required policy the attached signatures fall short of.
    pub fn unsatisfied(&self) -> Option<(&RequiredPolicy, u32)> {
        let signers = self.signatures.signers();
        self.required.iter().find_map(|required| {
            let collected = required.policy.collected(&signers);
            (collected < required.policy.required()).then_some((required, collected))
        })
    }

    /// Submit once every required policy is satisfied.
    ///
    /// The payer, if set, submits through a client operating as itself.
    pub async fn submit(&self) -> Result<ReceiptStatus, FixtureError> {
        if let Some((required, collected)) = self.unsatisfied() {
            return Err(FixtureError::InsufficientSignatures {
                policy: format!("{} ({})", required.label, required.policy),
                required: required.policy.required(),
                collected,
            });
        }

        let client = match &self.payer {
            Some(payer) => self
                .ledger
                .with_operator(payer.account(), payer.key().clone()),
            None => Arc::clone(&self.ledger),
        };
        let receipt = client.submit(&self.frozen, &self.signatures).await?;
        tracing::info!(
            transaction = %self.frozen.transaction_id(),
            signatures = self.signatures.len(),
            status = %receipt.status,
            "multi-party transfer submitted"
        );
        ensure_success("multi-party transfer", receipt.status, || {
            let legs: Vec<String> = self
                .frozen
                .body()
                .transfers
                .iter()
                .map(|leg| format!("{} {:+} {}", leg.account, leg.amount, leg.asset))
                .collect();
            format!(
                "transaction {}, legs [{}]",
                self.frozen.transaction_id(),
                legs.join(", ")
            )
        })?;
        Ok(receipt.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfx_core::ActorName;
    use lfx_crypto::{Ed25519KeyPair, ThresholdKey};
    use lfx_ledger::{SandboxConfig, SandboxLedger};

    fn identity(name: &str, num: u64, seed: u8) -> Identity {
        Identity::new(
            ActorName::new(name).unwrap(),
            AccountId::new(num),
            Ed25519KeyPair::from_seed(&[seed; 32]),
        )
    }

    fn ledger() -> Arc<dyn LedgerClient> {
        Arc::new(SandboxLedger::new(
            SandboxConfig::default(),
            AccountId::new(2),
            Ed25519KeyPair::from_seed(&[99; 32]),
        ))
    }

    #[tokio::test]
    async fn unbalanced_legs_are_refused_before_freezing() {
        let a = identity("a", 1001, 1);
        let mut builder = MultiPartyTransfer::builder(ledger());
        builder.debit(Asset::Native, &a, 5).unwrap();
        let err = builder.build(NodeId::new(3)).await.err().unwrap();
        assert!(matches!(
            err,
            FixtureError::Unbalanced { asset: Asset::Native, net: -5 }
        ));
    }

    #[tokio::test]
    async fn required_policies_follow_debits_payer_and_extras() {
        let a = identity("a", 1001, 1);
        let b = identity("b", 1002, 2);
        let c = identity("c", 1003, 3);
        let group = ThresholdKey::new(vec![b.public_key(), c.public_key()], 1).unwrap();

        let mut builder = MultiPartyTransfer::builder(ledger());
        builder
            .transfer(Asset::Native, &a, &b, 4)
            .unwrap()
            .payer(&c)
            .require("group", KeyPolicy::Threshold(group.clone()));
        let transfer = builder.build(NodeId::new(3)).await.unwrap();

        let policies: Vec<&KeyPolicy> = transfer.required().iter().map(|r| &r.policy).collect();
        assert_eq!(
            policies,
            vec![
                &KeyPolicy::Single(a.public_key()),
                &KeyPolicy::Single(c.public_key()),
                &KeyPolicy::Threshold(group),
            ]
        );
        assert_eq!(transfer.transaction_id().payer, c.account());
    }

    #[tokio::test]
    async fn re_signing_is_idempotent_and_foreign_signatures_are_refused() {
        let a = identity("a", 1001, 1);
        let b = identity("b", 1002, 2);
        let mut builder = MultiPartyTransfer::builder(ledger());
        builder.transfer(Asset::Native, &a, &b, 1).unwrap();
        let mut transfer = builder.build(NodeId::new(3)).await.unwrap();

        assert!(transfer.add_signature(&a).unwrap());
        assert!(!transfer.add_signature(&a).unwrap());
        assert_eq!(transfer.signatures().len(), 1);

        let stray = Ed25519KeyPair::from_seed(&[7; 32]);
        let forged = stray.sign(transfer.frozen().bytes());
        assert!(matches!(
            transfer.attach(b.public_key(), forged),
            Err(FixtureError::Crypto(_))
        ));
    }

    #[tokio::test]
    async fn submit_reports_the_first_short_policy() {
        let a = identity("a", 1001, 1);
        let b = identity("b", 1002, 2);
        let mut builder = MultiPartyTransfer::builder(ledger());
        builder.transfer(Asset::Native, &a, &b, 1).unwrap();
        let transfer = builder.build(NodeId::new(3)).await.unwrap();

        match transfer.submit().await.err().unwrap() {
            FixtureError::InsufficientSignatures {
                required,
                collected,
                policy,
            } => {
                assert_eq!((required, collected), (1, 0));
                assert!(policy.starts_with("a (0.0.1001)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
