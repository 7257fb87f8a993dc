//! In-memory chain, factory and rate doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, Bytes, LogData, U256};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use vault_runtime::balances::{VaultAssetStruct, VaultReader};
use vault_runtime::contracts::IPortfolioVault;
use vault_runtime::executor::{ConfirmedTransaction, TransactionSender};
use vault_runtime::factory::{VaultDeployment, VaultFactory};
use vault_runtime::interpreter::{Interpretation, StrategyInterpreter};
use vault_runtime::adapters::RateSource;
use vault_runtime::strategy::parse_strategy;
use vault_runtime::tokens::TokenRegistry;
use vault_runtime::vault_client::EncodedTransaction;
use vault_runtime::{
    PortfolioError, PortfolioService, Protocol, ReserveRate, ServiceParts,
};

pub const OWNER: Address = Address::repeat_byte(0x11);
pub const VAULT: Address = Address::repeat_byte(0x22);

/// Ordered record of everything the chain double observed.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct MockChain {
    pub log: CallLog,
    balances: Mutex<HashMap<Address, VaultAssetStruct>>,
    /// Index of the transaction whose confirmation fails
    fail_at: Mutex<Option<usize>>,
    sent: Mutex<usize>,
    vaults: Mutex<HashMap<Address, Address>>,
    pub deployments: Mutex<usize>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(Mutex::new(Vec::new())),
            balances: Mutex::new(HashMap::new()),
            fail_at: Mutex::new(None),
            sent: Mutex::new(0),
            vaults: Mutex::new(HashMap::new()),
            deployments: Mutex::new(0),
        })
    }

    pub fn set_balance(&self, token: Address, balance: VaultAssetStruct) {
        self.balances.lock().unwrap().insert(token, balance);
    }

    pub fn set_idle(&self, token: Address, amount: u64) {
        self.set_balance(
            token,
            VaultAssetStruct {
                balance: U256::from(amount),
                ..Default::default()
            },
        );
    }

    pub fn fail_confirmation_at(&self, index: usize) {
        *self.fail_at.lock().unwrap() = Some(index);
    }

    pub fn existing_vault(&self, owner: Address, vault: Address) {
        self.vaults.lock().unwrap().insert(owner, vault);
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn deployments(&self) -> usize {
        *self.deployments.lock().unwrap()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

fn describe_call(tx: &EncodedTransaction) -> String {
    if let Ok(call) = IPortfolioVault::lendTokensCall::abi_decode(&tx.data) {
        return format!("lend:{}:{}", call.protocol, call.amount);
    }
    if let Ok(call) = IPortfolioVault::withdrawLentTokensCall::abi_decode(&tx.data) {
        return format!("withdraw:{}:{}", call.protocol, call.amount);
    }
    format!("call:{}", hex::encode(tx.selector()))
}

#[async_trait]
impl VaultReader for MockChain {
    async fn asset_struct(
        &self,
        _vault: Address,
        token: Address,
    ) -> Result<VaultAssetStruct, PortfolioError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&token)
            .copied()
            .unwrap_or_default())
    }
}

#[async_trait]
impl TransactionSender for MockChain {
    async fn send_and_confirm(
        &self,
        tx: EncodedTransaction,
    ) -> Result<ConfirmedTransaction, PortfolioError> {
        let index = {
            let mut sent = self.sent.lock().unwrap();
            let index = *sent;
            *sent += 1;
            index
        };
        self.push(format!("send#{index} {}", describe_call(&tx)));

        // give a concurrent caller a chance to interleave if it could
        tokio::time::sleep(Duration::from_millis(5)).await;

        if *self.fail_at.lock().unwrap() == Some(index) {
            self.push(format!("fail#{index}"));
            return Err(PortfolioError::TransactionFailed(format!(
                "confirmation timed out for tx #{index}"
            )));
        }

        self.push(format!("confirm#{index}"));
        Ok(ConfirmedTransaction {
            tx_hash: format!("0x{index:064x}"),
            block_number: Some(1_000 + index as u64),
            gas_used: 90_000,
            success: true,
            logs: vec![LogData::new_unchecked(
                vec![IPortfolioVault::LiquiditySupplied::SIGNATURE_HASH, B256::ZERO],
                Bytes::new(),
            )],
        })
    }
}

#[async_trait]
impl VaultFactory for MockChain {
    async fn vault_of(&self, owner: Address) -> Result<Option<Address>, PortfolioError> {
        Ok(self.vaults.lock().unwrap().get(&owner).copied())
    }

    async fn create_vault(&self, owner: Address) -> Result<VaultDeployment, PortfolioError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let n = {
            let mut deployments = self.deployments.lock().unwrap();
            *deployments += 1;
            *deployments
        };
        let vault = Address::repeat_byte(0x20 + n as u8);
        self.vaults.lock().unwrap().insert(owner, vault);
        self.push(format!("deploy {owner}"));
        Ok(VaultDeployment {
            vault_address: vault,
            tx_hash: format!("0x{:064x}", 0xdead_0000u64 + n as u64),
        })
    }
}

pub struct FixedRates {
    protocol: Protocol,
    reserves: Vec<ReserveRate>,
}

impl FixedRates {
    pub fn new(protocol: Protocol, quotes: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            protocol,
            reserves: quotes
                .iter()
                .map(|(symbol, apy)| ReserveRate {
                    symbol: symbol.to_string(),
                    supply_apy: *apy,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl RateSource for FixedRates {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn lending_rates(&self) -> Result<Vec<ReserveRate>, PortfolioError> {
        Ok(self.reserves.clone())
    }
}

/// Interpreter returning a canned JSON reply.
pub struct CannedInterpreter(pub serde_json::Value);

#[async_trait]
impl StrategyInterpreter for CannedInterpreter {
    async fn interpret(&self, _description: &str) -> Result<Interpretation, PortfolioError> {
        Ok(match parse_strategy(&self.0) {
            Ok(s) => Interpretation::Strategy(s),
            Err(e) => Interpretation::ParseFailure {
                raw: self.0.to_string(),
                reason: e.to_string(),
            },
        })
    }
}

pub fn conservative_json() -> serde_json::Value {
    serde_json::json!({
        "riskLevel": "conservative",
        "allocations": { "lending": 100, "liquidity": 0 },
        "preferences": {
            "stablecoinsOnly": true,
            "preferredAssets": ["USDC"],
            "minimumAPY": 4
        }
    })
}

pub fn usdc() -> Address {
    TokenRegistry::default()
        .resolve("USDC")
        .expect("USDC in default registry")
}

pub fn service(
    chain: Arc<MockChain>,
    aave: f64,
    compound: f64,
    interpreter: Arc<dyn StrategyInterpreter>,
) -> PortfolioService {
    PortfolioService::new(ServiceParts {
        tokens: TokenRegistry::default(),
        reader: chain.clone(),
        sender: chain.clone(),
        factory: chain,
        rate_sources: vec![
            FixedRates::new(Protocol::Aave, &[("USDC", aave), ("WETH", 1.5)]),
            FixedRates::new(Protocol::Compound, &[("USDC", compound), ("ETH", 1.2)]),
        ],
        interpreter,
    })
}
