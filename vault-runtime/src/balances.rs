//! Balance reader: per-token vault holdings, read fresh from chain.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::PortfolioError;
use crate::tokens::TokenInfo;
use crate::types::AssetBalance;

/// Raw quadruple returned by the vault's balance-struct lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultAssetStruct {
    pub balance: U256,
    pub in_aave: U256,
    pub in_compound: U256,
    pub in_uniswap: U256,
}

#[async_trait]
pub trait VaultReader: Send + Sync {
    async fn asset_struct(
        &self,
        vault: Address,
        token: Address,
    ) -> Result<VaultAssetStruct, PortfolioError>;
}

/// Read every token's balances from `vault`.
///
/// All-or-nothing: the first failing token read fails the whole call,
/// naming the token that failed.
pub async fn get_balances(
    reader: &dyn VaultReader,
    vault: Address,
    tokens: &[TokenInfo],
) -> Result<Vec<AssetBalance>, PortfolioError> {
    let reads = tokens.iter().map(|token| async move {
        let raw = reader
            .asset_struct(vault, token.address)
            .await
            .map_err(|e| match e {
                PortfolioError::UpstreamRead { message, .. } => {
                    PortfolioError::upstream(format!("{} balance", token.symbol), message)
                }
                other => other,
            })?;

        tracing::debug!(
            vault = %vault,
            symbol = %token.symbol,
            balance = %raw.balance,
            in_aave = %raw.in_aave,
            in_compound = %raw.in_compound,
            in_uniswap = %raw.in_uniswap,
            "read vault asset"
        );

        Ok::<_, PortfolioError>(AssetBalance {
            token: token.address,
            symbol: token.symbol.clone(),
            decimals: token.decimals,
            balance: raw.balance,
            in_aave: raw.in_aave,
            in_compound: raw.in_compound,
            in_uniswap: raw.in_uniswap,
        })
    });

    futures::future::try_join_all(reads).await
}
