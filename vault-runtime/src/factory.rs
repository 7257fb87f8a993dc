use alloy::primitives::Address;
use async_trait::async_trait;

use crate::error::PortfolioError;

/// Result of a confirmed `createVault` transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultDeployment {
    pub vault_address: Address,
    pub tx_hash: String,
}

/// On-chain vault factory.
#[async_trait]
pub trait VaultFactory: Send + Sync {
    /// Vault already deployed for `owner`, if any. The factory reports
    /// "no vault" as the zero address; implementations map that to `None`.
    async fn vault_of(&self, owner: Address) -> Result<Option<Address>, PortfolioError>;

    /// Deploy a new vault for `owner` and wait for confirmation.
    async fn create_vault(&self, owner: Address) -> Result<VaultDeployment, PortfolioError>;
}
