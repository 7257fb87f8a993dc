//! Orchestration service: strategy creation, vault lifecycle, and the
//! read → reconcile → execute cycle.

use std::sync::Arc;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::{RateSource, fetch_all_rates};
use crate::balances::{VaultReader, get_balances};
use crate::error::{PortfolioError, ValidationError};
use crate::executor::{ActionExecutor, BatchReport, TransactionSender};
use crate::factory::VaultFactory;
use crate::interpreter::{Interpretation, StrategyInterpreter};
use crate::reconcile::reconcile;
use crate::store::VaultStore;
use crate::strategy::validate;
use crate::tokens::{TokenRegistry, format_units};
use crate::types::{
    AssetBalance, PortfolioStrategy, Protocol, ProtocolRates, ProtocolUserReserves,
    StrategyAction,
    VaultRecord, VaultStatus,
};

/// One asset in the human-readable portfolio view. Amounts are scaled by
/// the token's decimals.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAsset {
    pub symbol: String,
    pub balance: String,
    /// Total holdings (idle + deployed) in token units
    pub value: String,
    pub in_aave: String,
    pub in_compound: String,
    pub in_uniswap: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    /// Sum of stablecoin holdings, in USD. Volatile assets are not priced.
    pub total_value: String,
    pub assets: Vec<PortfolioAsset>,
}

impl PortfolioSummary {
    pub fn from_balances(balances: &[AssetBalance], tokens: &TokenRegistry) -> Self {
        let mut total = Decimal::ZERO;
        let assets = balances
            .iter()
            .map(|b| {
                let value = format_units(b.total(), b.decimals);
                if tokens.by_symbol(&b.symbol).is_some_and(|t| t.stablecoin) {
                    total = total.saturating_add(value);
                }
                PortfolioAsset {
                    symbol: b.symbol.clone(),
                    balance: format_units(b.balance, b.decimals).to_string(),
                    value: value.to_string(),
                    in_aave: format_units(b.in_aave, b.decimals).to_string(),
                    in_compound: format_units(b.in_compound, b.decimals).to_string(),
                    in_uniswap: format_units(b.in_uniswap, b.decimals).to_string(),
                }
            })
            .collect();

        Self {
            total_value: total.to_string(),
            assets,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StrategyProposal {
    pub current_portfolio: PortfolioSummary,
    pub suggested_actions: Vec<StrategyAction>,
}

#[derive(Debug, Clone)]
pub struct VaultCreation {
    pub record: VaultRecord,
    /// Set when a new vault was deployed by this call
    pub tx_hash: Option<String>,
}

/// Collaborators the service runs against
pub struct ServiceParts {
    pub tokens: TokenRegistry,
    pub reader: Arc<dyn VaultReader>,
    pub sender: Arc<dyn TransactionSender>,
    pub factory: Arc<dyn VaultFactory>,
    pub rate_sources: Vec<Arc<dyn RateSource>>,
    pub interpreter: Arc<dyn StrategyInterpreter>,
}

pub struct PortfolioService {
    store: VaultStore,
    tokens: TokenRegistry,
    reader: Arc<dyn VaultReader>,
    factory: Arc<dyn VaultFactory>,
    rate_sources: Vec<Arc<dyn RateSource>>,
    interpreter: Arc<dyn StrategyInterpreter>,
    executor: ActionExecutor,
}

impl PortfolioService {
    pub fn new(parts: ServiceParts) -> Self {
        Self {
            store: VaultStore::new(),
            executor: ActionExecutor::new(parts.tokens.clone(), parts.sender),
            tokens: parts.tokens,
            reader: parts.reader,
            factory: parts.factory,
            rate_sources: parts.rate_sources,
            interpreter: parts.interpreter,
        }
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    /// Interpret `description` into a validated strategy and attach it to
    /// `owner`, replacing any previous strategy.
    pub async fn create_strategy(
        &self,
        owner: Address,
        description: &str,
    ) -> Result<PortfolioStrategy, PortfolioError> {
        if description.trim().is_empty() {
            return Err(ValidationError::MissingRequestField("description").into());
        }

        let strategy = match self.interpreter.interpret(description).await? {
            Interpretation::Strategy(strategy) => strategy,
            Interpretation::ParseFailure { reason, raw } => {
                tracing::warn!(owner = %owner, raw_len = raw.len(), "strategy interpretation failed");
                return Err(PortfolioError::LlmParse(reason));
            }
        };

        self.store.attach_strategy(owner, strategy.clone()).await;
        tracing::info!(owner = %owner, risk_level = strategy.risk_level.as_str(), "strategy attached");
        Ok(strategy)
    }

    /// Return `owner`'s vault, deploying one only if none exists in the
    /// store or on chain.
    pub async fn create_vault(
        &self,
        owner: Address,
        strategy: Option<PortfolioStrategy>,
    ) -> Result<VaultCreation, PortfolioError> {
        if let Some(s) = &strategy {
            validate(s)?;
        }

        let _guard = self.store.lock_owner(owner).await;

        let (vault_address, tx_hash) = match self.store.get(owner).await {
            Some(record) => (record.vault_address, None),
            None => match self.factory.vault_of(owner).await? {
                Some(vault) => {
                    tracing::info!(owner = %owner, vault = %vault, "found existing vault on chain");
                    (vault, None)
                }
                None => {
                    let deployment = self.factory.create_vault(owner).await?;
                    (deployment.vault_address, Some(deployment.tx_hash))
                }
            },
        };

        self.store.insert(owner, vault_address, None).await;
        if let Some(s) = strategy {
            self.store.attach_strategy(owner, s).await;
        }

        let record = self
            .store
            .get(owner)
            .await
            .ok_or_else(|| PortfolioError::VaultNotFound(owner.to_string()))?;
        Ok(VaultCreation { record, tx_hash })
    }

    /// Vault record for `owner`, adopting a vault found on chain if the
    /// process has not seen it yet.
    pub async fn vault(&self, owner: Address) -> Result<VaultRecord, PortfolioError> {
        if let Some(record) = self.store.get(owner).await {
            return Ok(record);
        }
        match self.factory.vault_of(owner).await? {
            Some(vault) => Ok(self.store.insert(owner, vault, None).await),
            None => Err(PortfolioError::VaultNotFound(owner.to_string())),
        }
    }

    /// Read balances and rates, then propose actions for `owner`'s vault.
    pub async fn apply_strategy(&self, owner: Address) -> Result<StrategyProposal, PortfolioError> {
        let record = self.vault(owner).await?;
        let strategy = self
            .store
            .strategy(owner)
            .await
            .ok_or_else(|| PortfolioError::StrategyMissing(owner.to_string()))?;

        let (balances, rates) = futures::try_join!(
            get_balances(
                self.reader.as_ref(),
                record.vault_address,
                self.tokens.tokens()
            ),
            fetch_all_rates(&self.rate_sources),
        )?;

        let suggested_actions = reconcile(&balances, &strategy, &rates);
        tracing::info!(
            owner = %owner,
            vault = %record.vault_address,
            actions = suggested_actions.len(),
            "strategy reconciled"
        );

        Ok(StrategyProposal {
            current_portfolio: PortfolioSummary::from_balances(&balances, &self.tokens),
            suggested_actions,
        })
    }

    /// Execute `actions` against `owner`'s vault in order.
    ///
    /// A complete batch moves the vault to `active`. A partial batch leaves
    /// its status alone but refreshes `last_updated` if anything landed.
    pub async fn confirm_strategy(
        &self,
        owner: Address,
        actions: &[StrategyAction],
    ) -> Result<BatchReport, PortfolioError> {
        if actions.is_empty() {
            return Err(ValidationError::MissingRequestField("actions").into());
        }

        let _guard = self.store.lock_owner(owner).await;
        let record = self.vault(owner).await?;

        let report = self
            .executor
            .execute_batch(record.vault_address, actions)
            .await;

        if report.is_complete() {
            self.store.advance(owner, VaultStatus::Active).await?;
        } else if report.succeeded() > 0 {
            self.store.touch(owner).await?;
        }

        tracing::info!(
            owner = %owner,
            batch_id = %report.batch_id,
            succeeded = report.succeeded(),
            total = actions.len(),
            "batch finished"
        );
        Ok(report)
    }

    pub async fn protocol_rates(&self, protocol: Protocol) -> Result<ProtocolRates, PortfolioError> {
        let source = self
            .rate_sources
            .iter()
            .find(|s| s.protocol() == protocol)
            .ok_or_else(|| PortfolioError::ConfigError(format!("No rate source for {protocol}")))?;
        Ok(ProtocolRates {
            protocol,
            reserves: source.lending_rates().await?,
        })
    }

    /// `user`'s positions grouped by protocol. Protocols where the user
    /// holds nothing are left out.
    pub async fn user_reserves(
        &self,
        user: Address,
    ) -> Result<Vec<ProtocolUserReserves>, PortfolioError> {
        let per_source = futures::future::try_join_all(self.rate_sources.iter().map(|s| async move {
            Ok::<_, PortfolioError>(ProtocolUserReserves {
                protocol: s.protocol(),
                reserves: s.user_reserves(user).await?,
            })
        }))
        .await?;
        Ok(per_source
            .into_iter()
            .filter(|p| !p.reserves.is_empty())
            .collect())
    }
}
