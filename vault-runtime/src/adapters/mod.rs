pub mod aave_v3;
pub mod compound_v3;

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::error::PortfolioError;
use crate::types::{Protocol, ProtocolRates, ReserveRate, UserReserve};

pub use aave_v3::AaveV3RateSource;
pub use compound_v3::CompoundV3RateSource;

pub const SECONDS_PER_YEAR: f64 = 31_536_000.0;

/// Public Base mainnet RPC. The default Aave pool and Comet markets live here,
/// whichever chain the vaults are deployed on.
pub const BASE_MAINNET_RPC: &str = "https://mainnet.base.org";

/// Common trait for lending-protocol rate oracles
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Protocol this source reports for
    fn protocol(&self) -> Protocol;

    /// Current supply APY per market, as a percentage
    async fn lending_rates(&self) -> Result<Vec<ReserveRate>, PortfolioError>;

    /// Non-zero positions `user` holds directly in this protocol's markets
    async fn user_reserves(&self, _user: Address) -> Result<Vec<UserReserve>, PortfolioError> {
        Ok(Vec::new())
    }
}

/// Query every source concurrently. Any single failure fails the call.
pub async fn fetch_all_rates(
    sources: &[Arc<dyn RateSource>],
) -> Result<Vec<ProtocolRates>, PortfolioError> {
    let reads = sources.iter().map(|source| async move {
        let reserves = source.lending_rates().await?;
        Ok::<_, PortfolioError>(ProtocolRates {
            protocol: source.protocol(),
            reserves,
        })
    });
    futures::future::try_join_all(reads).await
}
