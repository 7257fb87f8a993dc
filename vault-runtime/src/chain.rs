//! Chain client for the EVM network hosting the vaults.
//!
//! Provides a configured provider with a local signer (the service's
//! controlling wallet) and implements the read/write seams used by the
//! balance reader, the vault factory and the action executor.

use std::time::Duration;

use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy::primitives::Address;
use alloy::providers::fillers::{
    BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy::providers::{DynProvider, Identity, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;

use crate::balances::{VaultAssetStruct, VaultReader};
use crate::contracts::{IPortfolioVault, IVaultFactory};
use crate::error::PortfolioError;
use crate::executor::{ConfirmedTransaction, TransactionSender};
use crate::factory::{VaultDeployment, VaultFactory};
use crate::vault_client::{EncodedTransaction, encode_create_vault};

/// The concrete provider type produced by `ProviderBuilder::new().wallet(...).connect_http(...)`.
///
/// This is a fully-configured provider that fills nonce, gas, chain ID, and
/// signs transactions with the supplied wallet.
pub type HttpProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

/// A chain client wrapping an alloy provider with a local signer.
pub struct ChainClient {
    pub provider: HttpProvider,
    pub wallet: EthereumWallet,
    pub chain_id: u64,
    pub factory_address: Address,
    confirmation_timeout: Option<Duration>,
}

impl ChainClient {
    /// Create a new chain client from an RPC URL and hex-encoded private key.
    ///
    /// The private key should be a hex string (with or without "0x" prefix).
    pub fn new(rpc_url: &str, private_key: &str, chain_id: u64) -> Result<Self, PortfolioError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| PortfolioError::ConfigError(format!("Invalid private key: {e}")))?;

        let wallet = EthereumWallet::from(signer);

        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| PortfolioError::ConfigError(format!("Invalid RPC URL: {e}")))?;

        let provider = ProviderBuilder::new()
            .wallet(wallet.clone())
            .connect_http(url);

        Ok(Self {
            provider,
            wallet,
            chain_id,
            factory_address: Address::ZERO,
            confirmation_timeout: None,
        })
    }

    pub fn with_factory(mut self, factory_address: Address) -> Self {
        self.factory_address = factory_address;
        self
    }

    /// Bound how long a submitted transaction may wait for its receipt.
    /// Without one, confirmation waits as long as the RPC client does.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = Some(timeout);
        self
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &HttpProvider {
        &self.provider
    }

    /// Type-erased handle for read-only consumers such as rate sources.
    pub fn read_provider(&self) -> DynProvider {
        self.provider.clone().erased()
    }

    fn require_factory(&self) -> Result<Address, PortfolioError> {
        if self.factory_address == Address::ZERO {
            return Err(PortfolioError::ConfigError(
                "Vault factory address not configured".into(),
            ));
        }
        Ok(self.factory_address)
    }
}

#[async_trait]
impl VaultReader for ChainClient {
    async fn asset_struct(
        &self,
        vault: Address,
        token: Address,
    ) -> Result<VaultAssetStruct, PortfolioError> {
        let contract = IPortfolioVault::new(vault, &self.provider);
        let asset = contract
            .getStruct(token)
            .call()
            .await
            .map_err(|e| PortfolioError::upstream(format!("vault balance of {token}"), e))?;

        Ok(VaultAssetStruct {
            balance: asset.balance,
            in_aave: asset.investedInAave,
            in_compound: asset.investedInCompound,
            in_uniswap: asset.investedInUniswap,
        })
    }
}

#[async_trait]
impl TransactionSender for ChainClient {
    async fn send_and_confirm(
        &self,
        tx: EncodedTransaction,
    ) -> Result<ConfirmedTransaction, PortfolioError> {
        let request = alloy::rpc::types::TransactionRequest::default()
            .to(tx.to)
            .input(tx.data.into())
            .value(tx.value);

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| PortfolioError::TransactionFailed(format!("Transaction send failed: {e}")))?;

        let tx_hash = format!("0x{}", hex::encode(pending.tx_hash().as_slice()));

        let receipt = pending
            .with_timeout(self.confirmation_timeout)
            .get_receipt()
            .await
            .map_err(|e| {
                PortfolioError::TransactionFailed(format!("Receipt fetch failed for {tx_hash}: {e}"))
            })?;

        Ok(ConfirmedTransaction {
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            success: receipt.status(),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.data.clone())
                .collect(),
        })
    }
}

#[async_trait]
impl VaultFactory for ChainClient {
    async fn vault_of(&self, owner: Address) -> Result<Option<Address>, PortfolioError> {
        let factory = IVaultFactory::new(self.require_factory()?, &self.provider);
        let vault = factory
            .ownerToVaultAddress(owner)
            .call()
            .await
            .map_err(|e| PortfolioError::upstream("vault address", e))?;

        Ok((vault != Address::ZERO).then_some(vault))
    }

    async fn create_vault(&self, owner: Address) -> Result<VaultDeployment, PortfolioError> {
        let factory = self.require_factory()?;
        let confirmed = self
            .send_and_confirm(encode_create_vault(factory, owner))
            .await?;

        if !confirmed.success {
            return Err(PortfolioError::TransactionFailed(format!(
                "VaultFactory.createVault reverted (tx {})",
                confirmed.tx_hash
            )));
        }

        // VaultCreated(owner indexed, vault indexed): topics[2] is the vault
        let from_event = confirmed.logs.iter().find_map(|log| {
            let topics = log.topics();
            (topics.len() >= 3 && topics[0] == IVaultFactory::VaultCreated::SIGNATURE_HASH)
                .then(|| Address::from_word(topics[2]))
        });

        let vault_address = match from_event {
            Some(vault) => vault,
            None => self
                .vault_of(owner)
                .await?
                .ok_or_else(|| PortfolioError::VaultNotFound(owner.to_string()))?,
        };

        tracing::info!(
            owner = %owner,
            vault = %vault_address,
            tx_hash = %confirmed.tx_hash,
            "vault deployed"
        );

        Ok(VaultDeployment {
            vault_address,
            tx_hash: confirmed.tx_hash,
        })
    }
}
