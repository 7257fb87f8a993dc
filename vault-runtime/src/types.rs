use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk appetite declared by a portfolio strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "conservative" => Some(RiskLevel::Conservative),
            "moderate" => Some(RiskLevel::Moderate),
            "aggressive" => Some(RiskLevel::Aggressive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Conservative => "conservative",
            RiskLevel::Moderate => "moderate",
            RiskLevel::Aggressive => "aggressive",
        }
    }
}

/// Percentage split between lending and liquidity provision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Allocations {
    pub lending: f64,
    pub liquidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Preferences {
    #[serde(rename = "stablecoinsOnly")]
    pub stablecoins_only: bool,
    #[serde(rename = "preferredAssets")]
    pub preferred_assets: Vec<String>,
    #[serde(rename = "minimumAPY", default, skip_serializing_if = "Option::is_none")]
    pub minimum_apy: Option<f64>,
}

/// Target allocation produced from a user's natural-language description.
///
/// Immutable once attached to a vault record; a new strategy replaces the
/// old one wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStrategy {
    pub risk_level: RiskLevel,
    pub allocations: Allocations,
    pub preferences: Preferences,
}

/// Vault lifecycle. `Funded` is never set by this service, it exists so
/// records detected on chain can be described accurately.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VaultStatus {
    Created,
    Funded,
    Active,
}

impl VaultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultStatus::Created => "created",
            VaultStatus::Funded => "funded",
            VaultStatus::Active => "active",
        }
    }
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-process record of a user's vault. Balances always come from chain.
#[derive(Debug, Clone)]
pub struct VaultRecord {
    pub owner: Address,
    pub vault_address: Address,
    pub status: VaultStatus,
    pub strategy: Option<PortfolioStrategy>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// External protocols the vault can route funds into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Aave,
    Compound,
    Uniswap,
    Aerodrome,
}

impl Protocol {
    /// Identifier the vault contract expects in its `protocol` string argument.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Aave => "aave",
            Protocol::Compound => "compound",
            Protocol::Uniswap => "uniswap",
            Protocol::Aerodrome => "aerodrome",
        }
    }

    pub fn is_lending(&self) -> bool {
        matches!(self, Protocol::Aave | Protocol::Compound)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-token balances read from the vault's asset struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBalance {
    pub token: Address,
    pub symbol: String,
    pub decimals: u8,
    /// Held by the vault and not deployed anywhere.
    pub balance: U256,
    pub in_aave: U256,
    pub in_compound: U256,
    pub in_uniswap: U256,
}

impl AssetBalance {
    pub fn idle(&self) -> U256 {
        self.balance
    }

    pub fn deployed_in(&self, protocol: Protocol) -> U256 {
        match protocol {
            Protocol::Aave => self.in_aave,
            Protocol::Compound => self.in_compound,
            Protocol::Uniswap => self.in_uniswap,
            Protocol::Aerodrome => U256::ZERO,
        }
    }

    pub fn total(&self) -> U256 {
        self.balance
            .saturating_add(self.in_aave)
            .saturating_add(self.in_compound)
            .saturating_add(self.in_uniswap)
    }
}

/// Vault entry point an action maps to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    LendTokens,
    WithdrawLent,
    AddLiquidity,
    RemoveLiquidity,
    SwapTokens,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::LendTokens => "lend_tokens",
            ActionKind::WithdrawLent => "withdraw_lent",
            ActionKind::AddLiquidity => "add_liquidity",
            ActionKind::RemoveLiquidity => "remove_liquidity",
            ActionKind::SwapTokens => "swap_tokens",
        }
    }
}

/// Second leg of a two-token action (liquidity pair or swap output).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PairParams {
    pub asset: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default = "default_fee_tier")]
    pub fee: u32,
    #[serde(default)]
    pub tick_lower: i32,
    #[serde(default)]
    pub tick_upper: i32,
}

fn default_fee_tier() -> u32 {
    3000
}

/// One atomic vault instruction. Amounts are raw token units as decimal
/// strings; `target_amount` is the amount moved by the action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StrategyAction {
    pub asset: String,
    pub current_amount: String,
    pub target_amount: String,
    pub action: ActionKind,
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<PairParams>,
}

/// Supply rate for one lending market, as a percentage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReserveRate {
    pub symbol: String,
    #[serde(rename = "supplyAPY")]
    pub supply_apy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolRates {
    pub protocol: Protocol,
    pub reserves: Vec<ReserveRate>,
}

impl ProtocolRates {
    /// Supply APY for `symbol`, matching markets case-insensitively and
    /// treating ETH and WETH as the same market.
    pub fn rate_for(&self, symbol: &str) -> Option<f64> {
        self.reserves
            .iter()
            .find(|r| same_market(&r.symbol, symbol))
            .map(|r| r.supply_apy)
    }
}

pub fn same_market(a: &str, b: &str) -> bool {
    fn canonical(s: &str) -> String {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "WETH" { "ETH".to_string() } else { upper }
    }
    canonical(a) == canonical(b)
}

/// A user's position in a Compound market
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserReserve {
    pub symbol: String,
    pub underlying_asset: String,
    pub balance: String,
}

/// A user's non-empty positions in one protocol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolUserReserves {
    pub protocol: Protocol,
    pub reserves: Vec<UserReserve>,
}
