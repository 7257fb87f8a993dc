use axum::{Router, routing::{get, post}, extract::{Path, State}, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vault_runtime::strategy::parse_strategy;
use vault_runtime::{PortfolioStrategy, VaultRecord, VaultStatus};

use crate::{ApiError, PortfolioApiState, api_error, require_address};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVaultRequest {
    pub user_address: Option<String>,
    pub strategy: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultResponse {
    pub owner: String,
    pub vault_address: String,
    pub status: VaultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<PortfolioStrategy>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl VaultResponse {
    fn new(record: VaultRecord, tx_hash: Option<String>) -> Self {
        Self {
            owner: record.owner.to_string(),
            vault_address: record.vault_address.to_string(),
            status: record.status,
            strategy: record.strategy,
            created_at: record.created_at,
            last_updated: record.last_updated,
            tx_hash,
        }
    }
}

pub fn router() -> Router<Arc<PortfolioApiState>> {
    Router::new()
        .route("/vault", post(create_vault))
        .route("/vault/{owner}", get(get_vault))
}

async fn create_vault(
    State(state): State<Arc<PortfolioApiState>>,
    Json(request): Json<CreateVaultRequest>,
) -> Result<Json<VaultResponse>, ApiError> {
    let owner = require_address(request.user_address.as_deref(), "userAddress")?;
    let strategy = request
        .strategy
        .as_ref()
        .map(parse_strategy)
        .transpose()
        .map_err(|e| api_error(e.into()))?;

    let created = state
        .service
        .create_vault(owner, strategy)
        .await
        .map_err(api_error)?;

    Ok(Json(VaultResponse::new(created.record, created.tx_hash)))
}

async fn get_vault(
    State(state): State<Arc<PortfolioApiState>>,
    Path(owner): Path<String>,
) -> Result<Json<VaultResponse>, ApiError> {
    let owner = require_address(Some(owner.as_str()), "owner")?;
    let record = state.service.vault(owner).await.map_err(api_error)?;
    Ok(Json(VaultResponse::new(record, None)))
}
