//! Calldata encoding for the per-user portfolio vault.
//!
//! Uses alloy contract bindings from `crate::contracts` to generate
//! properly ABI-encoded transaction data. Nothing here touches the network.

use alloy::primitives::aliases::{I24, U24};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use crate::contracts::{IPortfolioVault, IVaultFactory};
use crate::error::PortfolioError;

/// Encoded transaction data ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl EncodedTransaction {
    fn call(to: Address, data: Vec<u8>) -> Self {
        Self {
            to,
            data: Bytes::from(data),
            value: U256::ZERO,
        }
    }

    /// First four bytes of calldata.
    pub fn selector(&self) -> [u8; 4] {
        let mut out = [0u8; 4];
        if self.data.len() >= 4 {
            out.copy_from_slice(&self.data[..4]);
        }
        out
    }
}

/// Represents one user's vault on-chain
#[derive(Debug, Clone, Copy)]
pub struct VaultClient {
    pub vault_address: Address,
}

impl VaultClient {
    pub fn new(vault_address: Address) -> Self {
        Self { vault_address }
    }

    /// Parse a decimal amount string into a U256.
    pub fn parse_amount(amount: &str) -> Result<U256, PortfolioError> {
        U256::from_str_radix(amount.trim(), 10)
            .map_err(|e| PortfolioError::EncodingError(format!("Invalid amount '{amount}': {e}")))
    }

    fn fee_tier(fee: u32) -> Result<U24, PortfolioError> {
        U24::try_from(fee)
            .map_err(|e| PortfolioError::EncodingError(format!("Invalid fee tier {fee}: {e}")))
    }

    fn tick(tick: i32) -> Result<I24, PortfolioError> {
        I24::try_from(tick)
            .map_err(|e| PortfolioError::EncodingError(format!("Invalid tick {tick}: {e}")))
    }

    /// Encode `lendTokens(string protocol, address token, uint256 amount)`
    pub fn encode_lend(&self, protocol: &str, token: Address, amount: U256) -> EncodedTransaction {
        let call = IPortfolioVault::lendTokensCall {
            protocol: protocol.to_string(),
            token,
            amount,
        };
        EncodedTransaction::call(self.vault_address, call.abi_encode())
    }

    /// Encode `withdrawLentTokens(string protocol, address token, uint256 amount)`
    pub fn encode_withdraw_lent(
        &self,
        protocol: &str,
        token: Address,
        amount: U256,
    ) -> EncodedTransaction {
        let call = IPortfolioVault::withdrawLentTokensCall {
            protocol: protocol.to_string(),
            token,
            amount,
        };
        EncodedTransaction::call(self.vault_address, call.abi_encode())
    }

    /// Encode `addLiquidity(string,address,address,uint256,uint256,uint24,int24,int24)`
    #[allow(clippy::too_many_arguments)]
    pub fn encode_add_liquidity(
        &self,
        protocol: &str,
        token0: Address,
        token1: Address,
        amount0: U256,
        amount1: U256,
        fee: u32,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Result<EncodedTransaction, PortfolioError> {
        if tick_lower >= tick_upper {
            return Err(PortfolioError::EncodingError(format!(
                "tickLower ({tick_lower}) must be below tickUpper ({tick_upper})"
            )));
        }
        let call = IPortfolioVault::addLiquidityCall {
            protocol: protocol.to_string(),
            token0,
            token1,
            amount0,
            amount1,
            fee: Self::fee_tier(fee)?,
            tickLower: Self::tick(tick_lower)?,
            tickUpper: Self::tick(tick_upper)?,
        };
        Ok(EncodedTransaction::call(self.vault_address, call.abi_encode()))
    }

    /// Encode `removeLiquidity(string protocol, address token0, address token1, uint256 liquidityAmount)`
    pub fn encode_remove_liquidity(
        &self,
        protocol: &str,
        token0: Address,
        token1: Address,
        liquidity_amount: U256,
    ) -> EncodedTransaction {
        let call = IPortfolioVault::removeLiquidityCall {
            protocol: protocol.to_string(),
            token0,
            token1,
            liquidityAmount: liquidity_amount,
        };
        EncodedTransaction::call(self.vault_address, call.abi_encode())
    }

    /// Encode `swapOnUniswap(address _tokenIn, address _tokenOut, uint256 _amountIn, uint24 _fee)`
    pub fn encode_swap(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: u32,
    ) -> Result<EncodedTransaction, PortfolioError> {
        let call = IPortfolioVault::swapOnUniswapCall {
            _tokenIn: token_in,
            _tokenOut: token_out,
            _amountIn: amount_in,
            _fee: Self::fee_tier(fee)?,
        };
        Ok(EncodedTransaction::call(self.vault_address, call.abi_encode()))
    }
}

/// Encode `createVault(address owner)` against the factory.
pub fn encode_create_vault(factory: Address, owner: Address) -> EncodedTransaction {
    let call = IVaultFactory::createVaultCall { owner };
    EncodedTransaction::call(factory, call.abi_encode())
}
