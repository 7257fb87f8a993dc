//! Reconciler: turn current balances and live rates into vault actions.
//!
//! Policy is greedy and single-pass: every asset with an idle balance is
//! lent in full to the lending protocol quoting the highest supply APY.
//! Capital already deployed is never moved.

use alloy::primitives::U256;

use crate::types::{
    ActionKind, AssetBalance, PortfolioStrategy, Protocol, ProtocolRates, StrategyAction,
};

/// Lending protocols in tie-break order: on equal APY the earlier one wins.
const LENDING_PROTOCOLS: [Protocol; 2] = [Protocol::Aave, Protocol::Compound];

/// Best lending protocol for `symbol`, or `None` if no protocol quotes it.
pub fn best_protocol(symbol: &str, rates: &[ProtocolRates]) -> Option<(Protocol, f64)> {
    let mut best: Option<(Protocol, f64)> = None;
    for protocol in LENDING_PROTOCOLS {
        let Some(apy) = rates
            .iter()
            .filter(|r| r.protocol == protocol)
            .find_map(|r| r.rate_for(symbol))
        else {
            continue;
        };
        if !apy.is_finite() {
            continue;
        }
        match best {
            Some((_, best_apy)) if apy <= best_apy => {}
            _ => best = Some((protocol, apy)),
        }
    }
    best
}

pub fn reconcile(
    balances: &[AssetBalance],
    strategy: &PortfolioStrategy,
    rates: &[ProtocolRates],
) -> Vec<StrategyAction> {
    tracing::debug!(
        risk_level = strategy.risk_level.as_str(),
        lending = strategy.allocations.lending,
        liquidity = strategy.allocations.liquidity,
        "reconciling against strategy"
    );

    let mut actions = Vec::new();
    for asset in balances {
        let idle = asset.idle();
        if idle == U256::ZERO {
            continue;
        }

        let Some((protocol, apy)) = best_protocol(&asset.symbol, rates) else {
            tracing::warn!(symbol = %asset.symbol, idle = %idle, "no lending rate for idle asset, skipping");
            continue;
        };

        tracing::debug!(symbol = %asset.symbol, protocol = %protocol, apy, "lending idle balance");
        actions.push(StrategyAction {
            asset: asset.symbol.clone(),
            current_amount: asset.deployed_in(protocol).to_string(),
            target_amount: idle.to_string(),
            action: ActionKind::LendTokens,
            protocol,
            pair: None,
        });
    }
    actions
}
