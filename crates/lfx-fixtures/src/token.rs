//! # Token Fixture
//!
//! Creates the fungible test asset, mints supply, and manages per-actor
//! balances of it. The asset's admin and supply keys belong to `admin`;
//! its treasury is `treasury`, which also funds actor token balances.
//!
//! Creating a token again replaces the stored asset id; the previous asset
//! is left untouched on the ledger.

use lfx_core::{ActorName, AssetId};
use lfx_crypto::Ed25519PublicKey;
use lfx_ledger::{Asset, AssetBalance, AssetConfig, AssetInfo, ReceiptStatus, SupplyType};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{ensure_success, FixtureError, FixtureKind};
use crate::reconcile::ReconcileOutcome;
use crate::registry::Registry;

/// Queryable token attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenField {
    Name,
    Symbol,
    Decimals,
    AdminKey,
    TotalSupply,
}

/// Value of a `TokenField`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum TokenFieldValue {
    Name(String),
    Symbol(String),
    Decimals(u32),
    AdminKey(Option<Ed25519PublicKey>),
    TotalSupply(u64),
}

impl TokenField {
    /// Read this field from asset info.
    pub fn read(self, info: &AssetInfo) -> TokenFieldValue {
        match self {
            Self::Name => TokenFieldValue::Name(info.name.clone()),
            Self::Symbol => TokenFieldValue::Symbol(info.symbol.clone()),
            Self::Decimals => TokenFieldValue::Decimals(info.decimals),
            Self::AdminKey => TokenFieldValue::AdminKey(info.admin_key),
            Self::TotalSupply => TokenFieldValue::TotalSupply(info.total_supply),
        }
    }
}

/// Whether a mint is expected to go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintExpectation {
    Success,
    Rejection,
}

/// Result of a mint that matched its expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MintOutcome {
    Minted { before: u64, after: u64 },
    Rejected { status: ReceiptStatus },
}

/// Token parameters for `TokenFixture::create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec {
    pub name: String,
    pub symbol: String,
    pub initial_supply: u64,
    /// Cap total supply at `initial_supply`.
    pub fixed_supply: bool,
}

impl TokenSpec {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, initial_supply: u64) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            initial_supply,
            fixed_supply: false,
        }
    }

    pub fn fixed(mut self) -> Self {
        self.fixed_supply = true;
        self
    }
}

pub struct TokenFixture {
    registry: Registry,
    asset: RwLock<Option<AssetId>>,
}

impl TokenFixture {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            asset: RwLock::new(None),
        }
    }

    /// The current asset, or `AssetNotInitialized`.
    pub fn asset_id(&self) -> Result<AssetId, FixtureError> {
        self.asset.read().ok_or(FixtureError::AssetNotInitialized {
            kind: FixtureKind::Token,
        })
    }

    /// Create a token and make it the current one.
    pub async fn create(&self, spec: &TokenSpec) -> Result<AssetId, FixtureError> {
        let admin = self.registry.resolve(ActorName::ADMIN).await?;
        let treasury = self.registry.resolve(ActorName::TREASURY).await?;
        let supply_type = if spec.fixed_supply {
            SupplyType::Finite {
                max_supply: spec.initial_supply,
            }
        } else {
            SupplyType::Infinite
        };
        let config = AssetConfig {
            name: spec.name.clone(),
            symbol: spec.symbol.clone(),
            decimals: 0,
            initial_supply: spec.initial_supply,
            treasury: treasury.account(),
            admin_key: Some(admin.public_key()),
            supply_key: Some(admin.public_key()),
            supply_type,
        };
        let receipt = self
            .registry
            .ledger()
            .create_asset(&config, &[treasury.key(), admin.key()])
            .await?;
        ensure_success("asset create", receipt.status, || {
            format!(
                "{} ({}), supply {}, treasury {}",
                spec.name,
                spec.symbol,
                spec.initial_supply,
                treasury.account()
            )
        })?;
        let asset = receipt.asset_id.ok_or_else(|| {
            lfx_ledger::LedgerError::InvalidTransaction(format!(
                "asset create {} returned no asset id",
                receipt.transaction_id
            ))
        })?;
        tracing::info!(%asset, name = %spec.name, symbol = %spec.symbol, supply = spec.initial_supply, fixed = spec.fixed_supply, "token created");
        *self.asset.write() = Some(asset);
        Ok(asset)
    }

    pub async fn info(&self) -> Result<AssetInfo, FixtureError> {
        let asset = self.asset_id()?;
        Ok(self.registry.ledger().asset_info(asset).await?)
    }

    pub async fn query(&self, field: TokenField) -> Result<TokenFieldValue, FixtureError> {
        Ok(field.read(&self.info().await?))
    }

    pub async fn name(&self) -> Result<String, FixtureError> {
        Ok(self.info().await?.name)
    }

    pub async fn symbol(&self) -> Result<String, FixtureError> {
        Ok(self.info().await?.symbol)
    }

    pub async fn decimals(&self) -> Result<u32, FixtureError> {
        Ok(self.info().await?.decimals)
    }

    pub async fn admin_key(&self) -> Result<Option<Ed25519PublicKey>, FixtureError> {
        Ok(self.info().await?.admin_key)
    }

    pub async fn total_supply(&self) -> Result<u64, FixtureError> {
        Ok(self.info().await?.total_supply)
    }

    /// Mint `amount` into the treasury, signed by the treasury, and check
    /// the resulting supply against `expectation`.
    pub async fn mint(
        &self,
        amount: u64,
        expectation: MintExpectation,
    ) -> Result<MintOutcome, FixtureError> {
        let asset = self.asset_id()?;
        let treasury = self.registry.resolve(ActorName::TREASURY).await?;
        let before = self.total_supply().await?;
        let receipt = self
            .registry
            .ledger()
            .mint_asset(asset, amount, treasury.key())
            .await?;
        let after = self.total_supply().await?;
        tracing::info!(%asset, amount, before, after, status = %receipt.status, "mint");

        match (expectation, receipt.status.is_success()) {
            (MintExpectation::Success, true) => {
                let expected = before.saturating_add(amount);
                if after != expected {
                    return Err(FixtureError::SupplyMismatch {
                        expected,
                        actual: after,
                    });
                }
                Ok(MintOutcome::Minted { before, after })
            }
            (MintExpectation::Success, false) => Err(FixtureError::OperationRejected {
                operation: "mint",
                status: receipt.status,
                context: format!("{amount} of asset {asset}, supply {before}"),
            }),
            (MintExpectation::Rejection, true) => {
                Err(FixtureError::UnexpectedSuccess { operation: "mint" })
            }
            (MintExpectation::Rejection, false) => {
                if after != before {
                    return Err(FixtureError::SupplyMismatch {
                        expected: before,
                        actual: after,
                    });
                }
                Ok(MintOutcome::Rejected {
                    status: receipt.status,
                })
            }
        }
    }

    /// Associate `actor` with the token. `false` if it already was.
    pub async fn associate(&self, actor: &str) -> Result<bool, FixtureError> {
        let asset = self.asset_id()?;
        let identity = self.registry.resolve(actor).await?;
        self.registry.reconciler().associate(asset, &identity).await
    }

    pub async fn balance(&self, actor: &str) -> Result<AssetBalance, FixtureError> {
        let asset = self.asset_id()?;
        let identity = self.registry.resolve(actor).await?;
        Ok(self
            .registry
            .ledger()
            .asset_balance(identity.account(), asset)
            .await?)
    }

    /// Bring `actor`'s token balance to `target`, settling against the
    /// treasury.
    pub async fn ensure_balance(
        &self,
        actor: &str,
        target: u64,
    ) -> Result<ReconcileOutcome, FixtureError> {
        let asset = self.asset_id()?;
        let identity = self.registry.resolve(actor).await?;
        let treasury = self.registry.resolve(ActorName::TREASURY).await?;
        self.registry
            .reconciler()
            .reconcile(Asset::Token(asset), &identity, target, &treasury)
            .await
    }
}
