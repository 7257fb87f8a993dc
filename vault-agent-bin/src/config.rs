//! Environment configuration for the agent process.

use std::net::SocketAddr;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, bail};
use vault_runtime::adapters::BASE_MAINNET_RPC;
use vault_runtime::adapters::aave_v3::AAVE_V3_POOL_BASE;
use vault_runtime::adapters::compound_v3::{CometMarket, base_markets, parse_markets};
use vault_runtime::interpreter::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use vault_runtime::tokens::TokenRegistry;

const REQUIRED: [&str; 4] = [
    "RPC_URL",
    "AGENT_PRIVATE_KEY",
    "VAULT_FACTORY_ADDRESS",
    "LLM_API_KEY",
];

/// Base Sepolia
const DEFAULT_CHAIN_ID: u64 = 84532;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub rpc_url: String,
    /// RPC used for Aave/Compound rate reads. Defaults to Base mainnet, where
    /// the default pool and markets are deployed.
    pub rates_rpc_url: String,
    pub private_key: String,
    pub chain_id: u64,
    pub factory_address: Address,
    pub aave_pool: Address,
    pub compound_markets: Vec<CometMarket>,
    pub tokens: TokenRegistry,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_endpoint: String,
    pub llm_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub api_token: Option<String>,
    pub bind_addr: SocketAddr,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let rpc_url = required("RPC_URL");
        let rates_rpc_url =
            get("RATES_RPC_URL").unwrap_or_else(|| BASE_MAINNET_RPC.to_string());

        let factory_address = required("VAULT_FACTORY_ADDRESS")
            .parse::<Address>()
            .context("VAULT_FACTORY_ADDRESS is not a valid address")?;
        let aave_pool = match get("AAVE_POOL_ADDRESS") {
            Some(v) => v
                .parse::<Address>()
                .context("AAVE_POOL_ADDRESS is not a valid address")?,
            None => AAVE_V3_POOL_BASE,
        };
        let compound_markets = match get("COMPOUND_MARKETS") {
            Some(v) => parse_markets(&v)?,
            None => base_markets(),
        };
        let tokens = match get("SUPPORTED_TOKENS") {
            Some(v) => TokenRegistry::parse(&v)?,
            None => TokenRegistry::default(),
        };

        Ok(Self {
            rates_rpc_url,
            rpc_url,
            private_key: required("AGENT_PRIVATE_KEY"),
            chain_id: parse_or(&get, "CHAIN_ID", DEFAULT_CHAIN_ID)?,
            factory_address,
            aave_pool,
            compound_markets,
            tokens,
            llm_api_key: required("LLM_API_KEY"),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_endpoint: get("LLM_API_ENDPOINT")
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            llm_timeout: Duration::from_secs(parse_or(
                &get,
                "LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
            confirmation_timeout: Duration::from_secs(parse_or(
                &get,
                "CONFIRMATION_TIMEOUT_SECS",
                DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            )?),
            api_token: get("API_TOKEN"),
            bind_addr: get("BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
                .parse()
                .context("BIND_ADDR is not a valid socket address")?,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v.parse().with_context(|| format!("{key} has invalid value '{v}'")),
        None => Ok(default),
    }
}
