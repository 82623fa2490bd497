//! # Named Actor Registry
//!
//! Maps actor names to identities and provisions the fixed actor pool on
//! first access.
//!
//! ## Bootstrap
//!
//! Bootstrap is single-flight and moves through three phases:
//!
//! - `Uninitialized`: nothing in flight. The next access starts a run.
//! - `Initializing`: one run is in flight as a shared future. Every caller
//!   arriving now awaits that same future instead of starting another run.
//! - `Ready`: the pool exists. Accesses proceed immediately.
//!
//! A failed run returns the phase to `Uninitialized` so the next access
//! retries, and every waiter receives the same `BootstrapFailure`. Actors
//! provisioned before the failure stay registered; the retry reconciles
//! their balances instead of creating them again.
//!
//! Ad-hoc actors created by `ensure_balance` follow the same rule per name:
//! concurrent callers for a name not yet registered share one account
//! creation.
//!
//! The `admin` actor is seeded from the operator credentials at
//! construction and never provisioned.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use lfx_core::{AccountId, ActorName};
use lfx_crypto::Ed25519KeyPair;
use lfx_ledger::{Asset, LedgerClient, LedgerConfig, LedgerError};
use parking_lot::{Mutex, RwLock};

use crate::error::{ensure_success, FixtureError};
use crate::identity::Identity;
use crate::reconcile::BalanceReconciler;

type BootstrapFuture = Shared<BoxFuture<'static, Result<(), FixtureError>>>;
type CreateFuture = Shared<BoxFuture<'static, Result<Identity, FixtureError>>>;

/// An account creation in flight, with the balance it was funded with.
struct PendingCreate {
    balance: u64,
    future: CreateFuture,
}

enum Provisioning {
    Registered(Identity),
    Creating { balance: u64, future: CreateFuture },
}

enum BootstrapPhase {
    Uninitialized,
    Initializing {
        generation: u64,
        future: BootstrapFuture,
    },
    Ready,
}

struct PhaseState {
    phase: BootstrapPhase,
    generation: u64,
    runs: u64,
}

struct RegistryInner {
    ledger: Arc<dyn LedgerClient>,
    reconciler: BalanceReconciler,
    plan: Vec<(ActorName, u64)>,
    accounts: RwLock<BTreeMap<ActorName, Identity>>,
    creating: Mutex<BTreeMap<ActorName, PendingCreate>>,
    phase: Mutex<PhaseState>,
}

/// Name to identity store with lazy, single-flight bootstrap.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("actors", &self.inner.accounts.read().len())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Registry {
    /// A registry seeded with `admin`, provisioning `plan` on first access.
    pub fn new(ledger: Arc<dyn LedgerClient>, admin: Identity, plan: Vec<(ActorName, u64)>) -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert(admin.name().clone(), admin);
        Self {
            inner: Arc::new(RegistryInner {
                reconciler: BalanceReconciler::new(Arc::clone(&ledger)),
                ledger,
                plan,
                accounts: RwLock::new(accounts),
                creating: Mutex::new(BTreeMap::new()),
                phase: Mutex::new(PhaseState {
                    phase: BootstrapPhase::Uninitialized,
                    generation: 0,
                    runs: 0,
                }),
            }),
        }
    }

    /// A registry whose `admin` is the configured operator.
    pub fn from_config(
        ledger: Arc<dyn LedgerClient>,
        config: &LedgerConfig,
        plan: Vec<(ActorName, u64)>,
    ) -> Result<Self, FixtureError> {
        let admin = admin_identity(config.operator_account, config.operator_key.clone())?;
        Ok(Self::new(ledger, admin, plan))
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.inner.ledger
    }

    pub fn reconciler(&self) -> &BalanceReconciler {
        &self.inner.reconciler
    }

    /// Whether bootstrap has completed.
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.phase.lock().phase, BootstrapPhase::Ready)
    }

    /// Number of bootstrap runs started so far.
    pub fn bootstrap_runs(&self) -> u64 {
        self.inner.phase.lock().runs
    }

    /// Snapshot of every registered identity, by name.
    pub fn identities(&self) -> BTreeMap<ActorName, Identity> {
        self.inner.accounts.read().clone()
    }

    /// The operator actor. Available without bootstrap.
    pub fn admin(&self) -> Result<Identity, FixtureError> {
        self.lookup(ActorName::ADMIN)
    }

    /// Provision the actor pool unless it already is, joining any run in
    /// flight.
    pub async fn bootstrap(&self) -> Result<(), FixtureError> {
        let (generation, future) = {
            let mut state = self.inner.phase.lock();
            match &state.phase {
                BootstrapPhase::Ready => return Ok(()),
                BootstrapPhase::Initializing { generation, future } => (*generation, future.clone()),
                BootstrapPhase::Uninitialized => {
                    state.generation += 1;
                    state.runs += 1;
                    let generation = state.generation;
                    let registry = self.clone();
                    let future = async move { registry.run_bootstrap().await }
                        .boxed()
                        .shared();
                    state.phase = BootstrapPhase::Initializing {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut state = self.inner.phase.lock();
        let current = matches!(
            &state.phase,
            BootstrapPhase::Initializing { generation: g, .. } if *g == generation
        );
        if current {
            state.phase = if result.is_ok() {
                BootstrapPhase::Ready
            } else {
                BootstrapPhase::Uninitialized
            };
        }
        result
    }

    async fn run_bootstrap(&self) -> Result<(), FixtureError> {
        tracing::info!(actors = self.inner.plan.len(), "bootstrap started");
        for (name, balance) in &self.inner.plan {
            if let Err(err) = self.provision(name, *balance).await {
                tracing::error!(actor = %name, error = %err, "bootstrap failed");
                return Err(FixtureError::BootstrapFailure {
                    source: Box::new(err),
                });
            }
        }
        tracing::info!("bootstrap complete");
        Ok(())
    }

    /// Identity registered under `name`, bootstrapping first if needed.
    pub async fn resolve(&self, name: &str) -> Result<Identity, FixtureError> {
        self.bootstrap().await?;
        self.lookup(name)
    }

    /// Ensure `name` holds exactly `target` native units.
    ///
    /// An unknown name gets a new account funded with `target`. A known one
    /// is reconciled against `admin`.
    pub async fn ensure_balance(&self, name: &str, target: u64) -> Result<Identity, FixtureError> {
        self.bootstrap().await?;
        let name = ActorName::new(name)?;
        self.provision(&name, target).await
    }

    fn lookup(&self, name: &str) -> Result<Identity, FixtureError> {
        self.inner
            .accounts
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FixtureError::UnknownActor {
                name: name.to_string(),
            })
    }

    async fn provision(&self, name: &ActorName, target: u64) -> Result<Identity, FixtureError> {
        let provisioning = {
            let mut creating = self.inner.creating.lock();
            // Checked under `creating`: a finished creation registers its
            // identity before leaving the map.
            let existing = self.inner.accounts.read().get(name).cloned();
            match existing {
                Some(identity) => Provisioning::Registered(identity),
                None => {
                    let pending = creating.entry(name.clone()).or_insert_with(|| {
                        let registry = self.clone();
                        let name = name.clone();
                        let future = async move {
                            let result = registry.create(&name, target).await;
                            registry.inner.creating.lock().remove(&name);
                            result
                        }
                        .boxed()
                        .shared();
                        PendingCreate {
                            balance: target,
                            future,
                        }
                    });
                    Provisioning::Creating {
                        balance: pending.balance,
                        future: pending.future.clone(),
                    }
                }
            }
        };

        match provisioning {
            Provisioning::Registered(identity) => self.reconcile(identity, target).await,
            Provisioning::Creating { balance, future } => {
                let identity = future.await?;
                if balance == target {
                    Ok(identity)
                } else {
                    self.reconcile(identity, target).await
                }
            }
        }
    }

    async fn reconcile(&self, identity: Identity, target: u64) -> Result<Identity, FixtureError> {
        let admin = self.admin()?;
        self.inner
            .reconciler
            .reconcile(Asset::Native, &identity, target, &admin)
            .await?;
        Ok(identity)
    }

    async fn create(&self, name: &ActorName, initial_balance: u64) -> Result<Identity, FixtureError> {
        let key = Ed25519KeyPair::generate();
        let receipt = self
            .inner
            .ledger
            .create_account(initial_balance, key.public_key())
            .await?;
        ensure_success("account create", receipt.status, || {
            format!("actor {name}, initial balance {initial_balance}")
        })?;
        let account = receipt.account_id.ok_or_else(|| {
            LedgerError::InvalidTransaction(format!(
                "account create {} returned no account id",
                receipt.transaction_id
            ))
        })?;
        tracing::info!(actor = %name, %account, initial_balance, "account created");

        let identity = Identity::new(name.clone(), account, key);
        let mut accounts = self.inner.accounts.write();
        Ok(accounts.entry(name.clone()).or_insert(identity).clone())
    }
}

fn admin_identity(account: AccountId, key: Ed25519KeyPair) -> Result<Identity, FixtureError> {
    Ok(Identity::new(ActorName::new(ActorName::ADMIN)?, account, key))
}
