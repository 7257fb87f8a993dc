//! In-process vault records, keyed by owner address.
//!
//! Records live for the lifetime of the process. Balances are never stored
//! here; they are always read from chain. Callers that mutate a vault's
//! on-chain state take the owner's lock first so that creation and batch
//! execution for one owner never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::PortfolioError;
use crate::types::{PortfolioStrategy, VaultRecord, VaultStatus};

#[derive(Default)]
pub struct VaultStore {
    records: RwLock<HashMap<Address, VaultRecord>>,
    /// Strategies generated before the owner has a vault
    pending: RwLock<HashMap<Address, PortfolioStrategy>>,
    /// Only owners with a holder or a waiter have an entry
    locks: DashMap<Address, Arc<Mutex<()>>>,
}

/// Held while mutating one owner's on-chain state. Dropping it releases the
/// lock and removes the owner's entry if nobody else is waiting on it.
pub struct OwnerLock<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a DashMap<Address, Arc<Mutex<()>>>,
    owner: Address,
}

impl Drop for OwnerLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // clones are only made under the shard lock, so a count of one
        // means no holder and no waiter
        self.locks
            .remove_if(&self.owner, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl VaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize on-chain mutations for `owner`. Held until the guard drops.
    pub async fn lock_owner(&self, owner: Address) -> OwnerLock<'_> {
        let lock = self
            .locks
            .entry(owner)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        OwnerLock {
            guard: Some(lock.lock_owned().await),
            locks: &self.locks,
            owner,
        }
    }

    /// Owners that currently hold or wait on their lock.
    pub fn locked_owners(&self) -> usize {
        self.locks.len()
    }

    pub async fn get(&self, owner: Address) -> Option<VaultRecord> {
        self.records.read().await.get(&owner).cloned()
    }

    pub async fn list(&self) -> Vec<VaultRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Insert a freshly created or discovered vault. An existing record for
    /// the same owner is returned unchanged; at most one vault per owner.
    pub async fn insert(
        &self,
        owner: Address,
        vault_address: Address,
        strategy: Option<PortfolioStrategy>,
    ) -> VaultRecord {
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&owner) {
            return existing.clone();
        }

        let strategy = match strategy {
            Some(s) => Some(s),
            None => self.pending.write().await.remove(&owner),
        };
        let now = Utc::now();
        let record = VaultRecord {
            owner,
            vault_address,
            status: VaultStatus::Created,
            strategy,
            created_at: now,
            last_updated: now,
        };
        records.insert(owner, record.clone());
        tracing::info!(owner = %owner, vault = %vault_address, "vault record created");
        record
    }

    /// Attach a strategy, replacing any previous one. Owners without a vault
    /// keep it pending until their vault record is created.
    pub async fn attach_strategy(&self, owner: Address, strategy: PortfolioStrategy) {
        let mut records = self.records.write().await;
        match records.get_mut(&owner) {
            Some(record) => {
                record.strategy = Some(strategy);
                record.last_updated = Utc::now();
            }
            None => {
                self.pending.write().await.insert(owner, strategy);
            }
        }
    }

    /// Strategy attached to `owner`'s vault, or pending for it.
    pub async fn strategy(&self, owner: Address) -> Option<PortfolioStrategy> {
        if let Some(record) = self.records.read().await.get(&owner) {
            if record.strategy.is_some() {
                return record.strategy.clone();
            }
        }
        self.pending.read().await.get(&owner).cloned()
    }

    /// Advance `owner`'s vault to `status`. Moving backwards is rejected;
    /// re-entering the current status only refreshes `last_updated`.
    pub async fn advance(
        &self,
        owner: Address,
        status: VaultStatus,
    ) -> Result<VaultRecord, PortfolioError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&owner)
            .ok_or_else(|| PortfolioError::VaultNotFound(owner.to_string()))?;

        if status < record.status {
            return Err(PortfolioError::InvalidTransition {
                from: record.status.to_string(),
                to: status.to_string(),
            });
        }
        if status != record.status {
            tracing::info!(owner = %owner, from = %record.status, to = %status, "vault status changed");
        }
        record.status = status;
        record.last_updated = Utc::now();
        Ok(record.clone())
    }

    pub async fn touch(&self, owner: Address) -> Result<VaultRecord, PortfolioError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&owner)
            .ok_or_else(|| PortfolioError::VaultNotFound(owner.to_string()))?;
        record.last_updated = Utc::now();
        Ok(record.clone())
    }
}
