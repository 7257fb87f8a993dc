use axum::{Router, routing::post, extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use vault_runtime::service::StrategyProposal;

use crate::{ApiError, PortfolioApiState, api_error, require_address};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub user_address: Option<String>,
}

pub fn router() -> Router<Arc<PortfolioApiState>> {
    Router::new().route("/apply-strategy", post(apply_strategy))
}

async fn apply_strategy(
    State(state): State<Arc<PortfolioApiState>>,
    Json(request): Json<ApplyRequest>,
) -> Result<Json<StrategyProposal>, ApiError> {
    let owner = require_address(request.user_address.as_deref(), "userAddress")?;
    let proposal = state
        .service
        .apply_strategy(owner)
        .await
        .map_err(api_error)?;
    Ok(Json(proposal))
}
