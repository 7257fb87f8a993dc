//! Canonical token set the vault operates on.
//!
//! Maps asset symbols used in strategies and actions to on-chain token
//! addresses, decimals and stablecoin classification.

use alloy::primitives::{Address, U256, address};
use rust_decimal::Decimal;

use crate::error::PortfolioError;

/// USDC on Base Sepolia
const USDC_BASE_SEPOLIA: Address = address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    pub stablecoin: bool,
}

#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: Vec<TokenInfo>,
}

impl TokenRegistry {
    pub fn new(tokens: Vec<TokenInfo>) -> Self {
        Self { tokens }
    }

    /// Parse `SYMBOL=0xaddr:decimals[:stable]` entries separated by commas.
    pub fn parse(spec: &str) -> Result<Self, PortfolioError> {
        let mut tokens = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (symbol, rest) = entry.split_once('=').ok_or_else(|| {
                PortfolioError::ConfigError(format!("Token entry '{entry}' missing '='"))
            })?;
            let mut parts = rest.split(':');
            let address = parts
                .next()
                .unwrap_or_default()
                .parse::<Address>()
                .map_err(|e| {
                    PortfolioError::ConfigError(format!("Invalid address for {symbol}: {e}"))
                })?;
            let decimals = match parts.next() {
                Some(d) => d.parse::<u8>().map_err(|e| {
                    PortfolioError::ConfigError(format!("Invalid decimals for {symbol}: {e}"))
                })?,
                None => 18,
            };
            let stablecoin = matches!(parts.next(), Some("stable"));
            tokens.push(TokenInfo {
                symbol: symbol.trim().to_string(),
                address,
                decimals,
                stablecoin,
            });
        }
        if tokens.is_empty() {
            return Err(PortfolioError::ConfigError("Token list is empty".into()));
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[TokenInfo] {
        &self.tokens
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.tokens.iter().map(|t| t.address).collect()
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&TokenInfo> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn by_address(&self, address: Address) -> Option<&TokenInfo> {
        self.tokens.iter().find(|t| t.address == address)
    }

    /// Resolve an action's asset symbol to its canonical token address.
    pub fn resolve(&self, symbol: &str) -> Result<Address, PortfolioError> {
        self.by_symbol(symbol)
            .map(|t| t.address)
            .ok_or_else(|| PortfolioError::UnknownAsset(symbol.to_string()))
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self {
            tokens: vec![
                TokenInfo {
                    symbol: "ETH".into(),
                    // native ETH is tracked by the vault under the zero address
                    address: Address::ZERO,
                    decimals: 18,
                    stablecoin: false,
                },
                TokenInfo {
                    symbol: "USDC".into(),
                    address: USDC_BASE_SEPOLIA,
                    decimals: 6,
                    stablecoin: true,
                },
            ],
        }
    }
}

/// Scale a raw token amount down by `decimals` for display.
///
/// Amounts beyond `u128` saturate; decimals above 28 are clamped to
/// what `Decimal` can represent.
pub fn format_units(amount: U256, decimals: u8) -> Decimal {
    let mut raw = u128::try_from(amount).unwrap_or(u128::MAX);
    let mut scale = u32::from(decimals).min(28);
    // Decimal mantissa is 96 bits; drop low digits until it fits.
    while raw > (1u128 << 96) - 1 {
        raw /= 10;
        if scale == 0 {
            return Decimal::MAX;
        }
        scale -= 1;
    }
    Decimal::from_i128_with_scale(raw as i128, scale).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = TokenRegistry::default();
        assert_eq!(registry.tokens().len(), 2);
        let usdc = registry.by_symbol("usdc").unwrap();
        assert_eq!(usdc.decimals, 6);
        assert!(usdc.stablecoin);
        assert_eq!(registry.resolve("ETH").unwrap(), Address::ZERO);
    }

    #[test]
    fn test_unknown_symbol() {
        let registry = TokenRegistry::default();
        assert!(matches!(
            registry.resolve("DOGE"),
            Err(PortfolioError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_parse_registry() {
        let registry = TokenRegistry::parse(
            "USDC=0x0000000000000000000000000000000000000002:6:stable, WETH=0x0000000000000000000000000000000000000003",
        )
        .unwrap();
        assert_eq!(registry.tokens().len(), 2);
        assert!(registry.by_symbol("USDC").unwrap().stablecoin);
        let weth = registry.by_symbol("WETH").unwrap();
        assert_eq!(weth.decimals, 18);
        assert!(!weth.stablecoin);
    }

    #[test]
    fn test_parse_registry_rejects_bad_entries() {
        assert!(TokenRegistry::parse("USDC").is_err());
        assert!(TokenRegistry::parse("USDC=not-an-address").is_err());
        assert!(TokenRegistry::parse("").is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), Decimal::new(15, 1));
        assert_eq!(format_units(U256::ZERO, 18), Decimal::ZERO);
        assert_eq!(
            format_units(U256::from(2_000_000_000_000_000_000u128), 18),
            Decimal::new(2, 0)
        );
    }
}
