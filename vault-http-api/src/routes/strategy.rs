use axum::{Router, routing::post, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vault_runtime::PortfolioStrategy;

use crate::{ApiError, PortfolioApiState, api_error, require_address};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRequest {
    pub user_address: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct StrategyResponse {
    pub strategy: PortfolioStrategy,
}

pub fn router() -> Router<Arc<PortfolioApiState>> {
    Router::new().route("/strategy", post(create_strategy))
}

async fn create_strategy(
    State(state): State<Arc<PortfolioApiState>>,
    Json(request): Json<StrategyRequest>,
) -> Result<Json<StrategyResponse>, ApiError> {
    let owner = require_address(request.user_address.as_deref(), "userAddress")?;
    let description = request.description.unwrap_or_default();

    let strategy = state
        .service
        .create_strategy(owner, &description)
        .await
        .map_err(api_error)?;

    Ok(Json(StrategyResponse { strategy }))
}
