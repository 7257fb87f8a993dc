use axum::{Router, routing::post, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use vault_runtime::StrategyAction;
use vault_runtime::executor::ActionOutcome;

use crate::{ApiError, PortfolioApiState, api_error, require_address};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub user_address: Option<String>,
    pub actions: Option<Vec<StrategyAction>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub batch_id: Uuid,
    /// One human-readable line per submitted action
    pub results: Vec<String>,
    pub outcomes: Vec<ActionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn router() -> Router<Arc<PortfolioApiState>> {
    Router::new().route("/confirm-strategy", post(confirm_strategy))
}

/// A batch that stops early is reported with 500 and the per-action
/// outcomes, so callers can see which transactions already landed.
async fn confirm_strategy(
    State(state): State<Arc<PortfolioApiState>>,
    Json(request): Json<ConfirmRequest>,
) -> Result<(StatusCode, Json<ConfirmResponse>), ApiError> {
    let owner = require_address(request.user_address.as_deref(), "userAddress")?;
    let actions = request.actions.unwrap_or_default();

    let report = state
        .service
        .confirm_strategy(owner, &actions)
        .await
        .map_err(api_error)?;

    let status = if report.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok((
        status,
        Json(ConfirmResponse {
            batch_id: report.batch_id,
            results: report.summaries(),
            error: report.failure().map(str::to_string),
            outcomes: report.outcomes,
        }),
    ))
}
