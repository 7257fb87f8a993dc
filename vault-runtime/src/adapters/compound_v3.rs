use std::future::IntoFuture;

use alloy::primitives::{Address, address};
use alloy::providers::DynProvider;
use async_trait::async_trait;

use super::{RateSource, SECONDS_PER_YEAR};
use crate::contracts::ICompoundComet;
use crate::error::PortfolioError;
use crate::tokens::format_units;
use crate::types::{Protocol, ReserveRate, UserReserve};

/// A Compound V3 (Comet) market, keyed by the symbol of its base asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CometMarket {
    pub symbol: String,
    pub comet: Address,
}

/// Compound V3 markets on Base
pub fn base_markets() -> Vec<CometMarket> {
    [
        ("USDC", address!("0xb125E6687d4313864e53df431d5425969c15Eb2F")),
        ("ETH", address!("0x46e6b214b524310239732D51387075E0e70970bf")),
        ("USDBC", address!("0x9c4ec768c28520B50860ea7a15bd7213a9fF58bf")),
        ("AERO", address!("0x784efeB622244d2348d4F2522f8860B96fbEcE89")),
    ]
    .into_iter()
    .map(|(symbol, comet)| CometMarket {
        symbol: symbol.to_string(),
        comet,
    })
    .collect()
}

/// Parse `SYMBOL=0xcomet` entries separated by commas.
pub fn parse_markets(spec: &str) -> Result<Vec<CometMarket>, PortfolioError> {
    spec.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|entry| {
            let (symbol, comet) = entry.split_once('=').ok_or_else(|| {
                PortfolioError::ConfigError(format!("Compound market '{entry}' missing '='"))
            })?;
            let comet = comet.trim().parse::<Address>().map_err(|e| {
                PortfolioError::ConfigError(format!("Invalid Comet address for {symbol}: {e}"))
            })?;
            Ok(CometMarket {
                symbol: symbol.trim().to_string(),
                comet,
            })
        })
        .collect()
}

/// Per-second supply rate (1e18 scale) to an annualized percentage.
///
/// Comet reports a simple per-second rate; no compounding is applied.
pub fn supply_rate_to_apy(rate_per_second: u64) -> f64 {
    rate_per_second as f64 / 1e18 * SECONDS_PER_YEAR * 100.0
}

pub struct CompoundV3RateSource {
    provider: DynProvider,
    markets: Vec<CometMarket>,
}

impl CompoundV3RateSource {
    pub fn new(provider: DynProvider, markets: Vec<CometMarket>) -> Self {
        Self { provider, markets }
    }

    pub fn markets(&self) -> &[CometMarket] {
        &self.markets
    }

    async fn market_rate(&self, market: &CometMarket) -> Result<ReserveRate, PortfolioError> {
        let comet = ICompoundComet::new(market.comet, &self.provider);
        let utilization = comet.getUtilization().call().await.map_err(|e| {
            PortfolioError::upstream(format!("{} utilization", market.symbol), e)
        })?;
        let rate = comet.getSupplyRate(utilization).call().await.map_err(|e| {
            PortfolioError::upstream(format!("{} supply rate", market.symbol), e)
        })?;

        Ok(ReserveRate {
            symbol: market.symbol.clone(),
            supply_apy: supply_rate_to_apy(rate),
        })
    }

    async fn user_position(
        &self,
        market: &CometMarket,
        user: Address,
    ) -> Result<Option<UserReserve>, PortfolioError> {
        let comet = ICompoundComet::new(market.comet, &self.provider);
        let symbol_call = comet.symbol();
        let balance_call = comet.balanceOf(user);
        let (symbol, balance) = futures::try_join!(symbol_call.call().into_future(), balance_call.call().into_future())
            .map_err(|e| PortfolioError::upstream("user reserves", e))?;

        if balance.is_zero() {
            return Ok(None);
        }
        Ok(Some(UserReserve {
            symbol,
            underlying_asset: market.comet.to_string(),
            balance: format_units(balance, 18).to_string(),
        }))
    }
}

/// Re-tag a per-market read failure as a Compound reserves failure,
/// keeping the market detail in the message without nesting the prefix.
fn reserves_error(e: PortfolioError) -> PortfolioError {
    match e {
        PortfolioError::UpstreamRead { what, message } => {
            PortfolioError::upstream("Compound reserves", format!("{what}: {message}"))
        }
        other => other,
    }
}

#[async_trait]
impl RateSource for CompoundV3RateSource {
    fn protocol(&self) -> Protocol {
        Protocol::Compound
    }

    async fn lending_rates(&self) -> Result<Vec<ReserveRate>, PortfolioError> {
        futures::future::try_join_all(self.markets.iter().map(|m| self.market_rate(m)))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error fetching Compound reserves");
                reserves_error(e)
            })
    }

    async fn user_reserves(&self, user: Address) -> Result<Vec<UserReserve>, PortfolioError> {
        let positions = futures::future::try_join_all(
            self.markets.iter().map(|m| self.user_position(m, user)),
        )
        .await
        .map_err(|e| {
            tracing::error!(user = %user, error = %e, "Error fetching user reserves");
            e
        })?;

        Ok(positions.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supply_rate_to_apy() {
        // ~3.15% APR: 1e9 per second
        let apy = supply_rate_to_apy(1_000_000_000);
        assert!((apy - 3.1536).abs() < 1e-9, "apy was {apy}");
        assert_eq!(supply_rate_to_apy(0), 0.0);
    }

    #[test]
    fn test_parse_markets() {
        let markets = parse_markets(
            "USDC=0xb125E6687d4313864e53df431d5425969c15Eb2F, ETH=0x46e6b214b524310239732D51387075E0e70970bf",
        )
        .unwrap();
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].symbol, "USDC");
        assert_eq!(markets, base_markets()[..2].to_vec());
    }

    #[test]
    fn test_market_failure_wrapped_once() {
        let inner = PortfolioError::upstream("USDC utilization", "execution reverted");
        let err = reserves_error(inner);
        assert_eq!(
            err.to_string(),
            "Failed to fetch Compound reserves: USDC utilization: execution reverted"
        );
        assert_eq!(err.to_string().matches("Failed to fetch").count(), 1);

        let other = reserves_error(PortfolioError::ConfigError("no markets".into()));
        assert!(matches!(other, PortfolioError::ConfigError(_)));
    }

    #[test]
    fn test_parse_markets_rejects_garbage() {
        assert!(parse_markets("USDC").is_err());
        assert!(parse_markets("USDC=0x12").is_err());
        assert!(parse_markets("").unwrap().is_empty());
    }
}
