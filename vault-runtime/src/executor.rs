//! Action execution pipeline: resolve tokens, encode the vault call,
//! submit from the service wallet and wait for confirmation.
//!
//! Batches run strictly in order on a single task. Each action is encoded
//! only after the previous one is confirmed, and the first failure stops
//! the batch; later actions are reported as not attempted.

use std::sync::Arc;

use alloy::primitives::{Address, LogData};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::contracts::IPortfolioVault;
use crate::error::PortfolioError;
use crate::tokens::TokenRegistry;
use crate::types::{ActionKind, PairParams, Protocol, StrategyAction};
use crate::vault_client::{EncodedTransaction, VaultClient};

/// A mined transaction as observed by the sender.
#[derive(Debug, Clone)]
pub struct ConfirmedTransaction {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Receipt status; `false` means the transaction reverted.
    pub success: bool,
    pub logs: Vec<LogData>,
}

/// Submits a transaction from the controlling wallet and waits until mined.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn send_and_confirm(
        &self,
        tx: EncodedTransaction,
    ) -> Result<ConfirmedTransaction, PortfolioError>;
}

/// Outcome of a confirmed, non-reverted action.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub message: String,
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Vault events found in the receipt
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Succeeded {
        action: StrategyAction,
        result: TransactionResult,
    },
    Failed {
        action: StrategyAction,
        reason: String,
    },
    NotAttempted {
        action: StrategyAction,
    },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded { .. })
    }

    /// Human-readable line for this outcome.
    pub fn summary(&self) -> String {
        match self {
            ActionOutcome::Succeeded { result, .. } => result.message.clone(),
            ActionOutcome::Failed { action, reason } => format!(
                "Failed to {} {} {}: {reason}",
                action.action.as_str(),
                action.target_amount,
                action.asset
            ),
            ActionOutcome::NotAttempted { action } => format!(
                "Skipped {} {} {} after an earlier failure",
                action.action.as_str(),
                action.target_amount,
                action.asset
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<ActionOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Every action confirmed.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(ActionOutcome::is_success)
    }

    pub fn failure(&self) -> Option<&str> {
        self.outcomes.iter().find_map(|o| match o {
            ActionOutcome::Failed { reason, .. } => Some(reason.as_str()),
            _ => None,
        })
    }

    pub fn summaries(&self) -> Vec<String> {
        self.outcomes.iter().map(ActionOutcome::summary).collect()
    }
}

/// Name of a vault event if `log` is one.
fn vault_event_name(log: &LogData) -> Option<&'static str> {
    let topic0 = log.topics().first()?;
    [
        (IPortfolioVault::LiquiditySupplied::SIGNATURE_HASH, "LiquiditySupplied"),
        (IPortfolioVault::LiquidityWithdrawn::SIGNATURE_HASH, "LiquidityWithdrawn"),
        (IPortfolioVault::LiquidityAdded::SIGNATURE_HASH, "LiquidityAdded"),
        (IPortfolioVault::LiquidityRemoved::SIGNATURE_HASH, "LiquidityRemoved"),
        (IPortfolioVault::TokensSwapped::SIGNATURE_HASH, "TokensSwapped"),
        (IPortfolioVault::ERC20Deposited::SIGNATURE_HASH, "ERC20Deposited"),
        (IPortfolioVault::ERC20Withdrawn::SIGNATURE_HASH, "ERC20Withdrawn"),
    ]
    .into_iter()
    .find(|(hash, _)| hash == topic0)
    .map(|(_, name)| name)
}

/// Event the vault emits when `kind` takes effect.
pub fn expected_event(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::LendTokens => "LiquiditySupplied",
        ActionKind::WithdrawLent => "LiquidityWithdrawn",
        ActionKind::AddLiquidity => "LiquidityAdded",
        ActionKind::RemoveLiquidity => "LiquidityRemoved",
        ActionKind::SwapTokens => "TokensSwapped",
    }
}

pub struct ActionExecutor {
    tokens: TokenRegistry,
    sender: Arc<dyn TransactionSender>,
}

impl ActionExecutor {
    pub fn new(tokens: TokenRegistry, sender: Arc<dyn TransactionSender>) -> Self {
        Self { tokens, sender }
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    fn pair<'a>(action: &'a StrategyAction) -> Result<&'a PairParams, PortfolioError> {
        action.pair.as_ref().ok_or_else(|| {
            PortfolioError::EncodingError(format!(
                "{} on {} requires pair parameters",
                action.action.as_str(),
                action.asset
            ))
        })
    }

    fn require_protocol(action: &StrategyAction, lending: bool) -> Result<(), PortfolioError> {
        if action.protocol.is_lending() != lending {
            return Err(PortfolioError::EncodingError(format!(
                "{} is not supported on {}",
                action.action.as_str(),
                action.protocol
            )));
        }
        Ok(())
    }

    /// Map an action onto the vault entry point it targets.
    pub fn encode(
        &self,
        vault: Address,
        action: &StrategyAction,
    ) -> Result<EncodedTransaction, PortfolioError> {
        let client = VaultClient::new(vault);
        let token = self.tokens.resolve(&action.asset)?;
        let amount = VaultClient::parse_amount(&action.target_amount)?;
        let protocol = action.protocol.as_str();

        match action.action {
            ActionKind::LendTokens => {
                Self::require_protocol(action, true)?;
                Ok(client.encode_lend(protocol, token, amount))
            }
            ActionKind::WithdrawLent => {
                Self::require_protocol(action, true)?;
                Ok(client.encode_withdraw_lent(protocol, token, amount))
            }
            ActionKind::AddLiquidity => {
                Self::require_protocol(action, false)?;
                let pair = Self::pair(action)?;
                let token1 = self.tokens.resolve(&pair.asset)?;
                let amount1 = VaultClient::parse_amount(&pair.amount)?;
                client.encode_add_liquidity(
                    protocol,
                    token,
                    token1,
                    amount,
                    amount1,
                    pair.fee,
                    pair.tick_lower,
                    pair.tick_upper,
                )
            }
            ActionKind::RemoveLiquidity => {
                Self::require_protocol(action, false)?;
                let pair = Self::pair(action)?;
                let token1 = self.tokens.resolve(&pair.asset)?;
                Ok(client.encode_remove_liquidity(protocol, token, token1, amount))
            }
            ActionKind::SwapTokens => {
                if action.protocol != Protocol::Uniswap {
                    return Err(PortfolioError::EncodingError(format!(
                        "swaps are only routed through uniswap, got {}",
                        action.protocol
                    )));
                }
                let pair = Self::pair(action)?;
                let token_out = self.tokens.resolve(&pair.asset)?;
                client.encode_swap(token, token_out, amount, pair.fee)
            }
        }
    }

    fn describe(action: &StrategyAction) -> String {
        let StrategyAction {
            asset,
            target_amount: amount,
            protocol,
            ..
        } = action;
        let pair = action.pair.as_ref();
        match action.action {
            ActionKind::LendTokens => format!("Successfully lent {amount} {asset} to {protocol}"),
            ActionKind::WithdrawLent => {
                format!("Successfully withdrew {amount} {asset} from {protocol}")
            }
            ActionKind::AddLiquidity => format!(
                "Successfully added liquidity: {amount} {asset} and {} {}",
                pair.map(|p| p.amount.as_str()).unwrap_or_default(),
                pair.map(|p| p.asset.as_str()).unwrap_or_default(),
            ),
            ActionKind::RemoveLiquidity => format!("Successfully removed {amount} LP tokens"),
            ActionKind::SwapTokens => format!(
                "Successfully swapped {amount} {asset} for {}",
                pair.map(|p| p.asset.as_str()).unwrap_or_default(),
            ),
        }
    }

    /// Encode, submit and confirm a single action.
    pub async fn execute(
        &self,
        vault: Address,
        action: &StrategyAction,
    ) -> Result<TransactionResult, PortfolioError> {
        let tx = self.encode(vault, action)?;
        let confirmed = self.sender.send_and_confirm(tx).await?;

        if !confirmed.success {
            return Err(PortfolioError::TransactionFailed(format!(
                "{} reverted (tx {})",
                action.action.as_str(),
                confirmed.tx_hash
            )));
        }

        let events: Vec<String> = confirmed
            .logs
            .iter()
            .filter_map(vault_event_name)
            .map(str::to_string)
            .collect();

        let expected = expected_event(action.action);
        if !events.iter().any(|e| e == expected) {
            tracing::warn!(
                tx_hash = %confirmed.tx_hash,
                expected,
                "confirmed transaction did not emit the expected vault event"
            );
        }

        tracing::info!(
            vault = %vault,
            action = action.action.as_str(),
            asset = %action.asset,
            protocol = %action.protocol,
            tx_hash = %confirmed.tx_hash,
            "action confirmed"
        );

        Ok(TransactionResult {
            message: Self::describe(action),
            tx_hash: confirmed.tx_hash,
            block_number: confirmed.block_number,
            gas_used: confirmed.gas_used,
            events,
        })
    }

    /// Run `actions` in order, stopping at the first failure.
    pub async fn execute_batch(&self, vault: Address, actions: &[StrategyAction]) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let mut outcomes = Vec::with_capacity(actions.len());
        let mut remaining = actions.iter();

        for action in remaining.by_ref() {
            match self.execute(vault, action).await {
                Ok(result) => outcomes.push(ActionOutcome::Succeeded {
                    action: action.clone(),
                    result,
                }),
                Err(e) => {
                    tracing::warn!(
                        batch_id = %batch_id,
                        vault = %vault,
                        asset = %action.asset,
                        error = %e,
                        "action failed, aborting batch"
                    );
                    outcomes.push(ActionOutcome::Failed {
                        action: action.clone(),
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        outcomes.extend(remaining.map(|action| ActionOutcome::NotAttempted {
            action: action.clone(),
        }));

        BatchReport { batch_id, outcomes }
    }
}
