use alloy::primitives::{Address, address};
use alloy::providers::DynProvider;
use async_trait::async_trait;

use super::{RateSource, SECONDS_PER_YEAR};
use crate::contracts::{IAavePool, IERC20Metadata};
use crate::error::PortfolioError;
use crate::types::{Protocol, ReserveRate};

/// Aave V3 Pool on Base
pub const AAVE_V3_POOL_BASE: Address = address!("0xA238Dd80C259a72e81d7e4664a9801593F98d1c5");

/// Reserves untouched for longer than this are logged as stale.
const STALE_AFTER_SECS: u64 = 86_400;

const RAY: f64 = 1e27;

/// Convert Aave's per-year liquidity rate (ray) to a compounded APY percentage.
///
/// Aave quotes `currentLiquidityRate` as an APR scaled by 1e27 and
/// compounds it per second.
pub fn ray_to_apy(liquidity_rate: u128) -> f64 {
    let apr = liquidity_rate as f64 / RAY;
    ((1.0 + apr / SECONDS_PER_YEAR).powf(SECONDS_PER_YEAR) - 1.0) * 100.0
}

pub struct AaveV3RateSource {
    provider: DynProvider,
    pool_address: Address,
}

impl AaveV3RateSource {
    pub fn new(provider: DynProvider) -> Self {
        Self {
            provider,
            pool_address: AAVE_V3_POOL_BASE,
        }
    }

    pub fn with_pool(provider: DynProvider, pool_address: Address) -> Self {
        Self {
            provider,
            pool_address,
        }
    }

    async fn reserve_rate(&self, asset: Address, now: u64) -> Result<ReserveRate, PortfolioError> {
        let pool = IAavePool::new(self.pool_address, &self.provider);
        let token = IERC20Metadata::new(asset, &self.provider);

        let data = pool
            .getReserveData(asset)
            .call()
            .await
            .map_err(|e| PortfolioError::upstream("Aave reserves", e))?;
        let symbol = token
            .symbol()
            .call()
            .await
            .map_err(|e| PortfolioError::upstream("Aave reserves", e))?;

        let updated_at = data.lastUpdateTimestamp.to::<u64>();
        if now.saturating_sub(updated_at) > STALE_AFTER_SECS {
            tracing::debug!(symbol = %symbol, updated_at, "aave reserve index is stale");
        }

        Ok(ReserveRate {
            symbol,
            supply_apy: ray_to_apy(data.currentLiquidityRate),
        })
    }
}

#[async_trait]
impl RateSource for AaveV3RateSource {
    fn protocol(&self) -> Protocol {
        Protocol::Aave
    }

    async fn lending_rates(&self) -> Result<Vec<ReserveRate>, PortfolioError> {
        let pool = IAavePool::new(self.pool_address, &self.provider);
        let reserves = pool
            .getReservesList()
            .call()
            .await
            .map_err(|e| PortfolioError::upstream("Aave reserves", e))?;

        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        let rates = futures::future::try_join_all(
            reserves.into_iter().map(|asset| self.reserve_rate(asset, now)),
        )
        .await;

        match rates {
            Ok(rates) => {
                tracing::debug!(count = rates.len(), "fetched aave reserves");
                Ok(rates)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching AAVE reserves");
                Err(e)
            }
        }
    }
}
