use axum::{Router, routing::get, extract::{Query, State}, Json};
use serde::Deserialize;
use std::sync::Arc;
use vault_runtime::{Protocol, ProtocolRates, ProtocolUserReserves};

use crate::{ApiError, PortfolioApiState, api_error, require_address};

#[derive(Deserialize)]
pub struct UserReservesQuery {
    pub address: Option<String>,
}

pub fn router() -> Router<Arc<PortfolioApiState>> {
    Router::new()
        .route("/aave/reserves/apy", get(aave_reserves))
        .route("/compound/reserves/apy", get(compound_reserves))
        .route("/user/reserves", get(user_reserves))
}

async fn protocol_reserves(
    state: &PortfolioApiState,
    protocol: Protocol,
) -> Result<Json<ProtocolRates>, ApiError> {
    state
        .service
        .protocol_rates(protocol)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn aave_reserves(
    State(state): State<Arc<PortfolioApiState>>,
) -> Result<Json<ProtocolRates>, ApiError> {
    protocol_reserves(&state, Protocol::Aave).await
}

async fn compound_reserves(
    State(state): State<Arc<PortfolioApiState>>,
) -> Result<Json<ProtocolRates>, ApiError> {
    protocol_reserves(&state, Protocol::Compound).await
}

async fn user_reserves(
    State(state): State<Arc<PortfolioApiState>>,
    Query(query): Query<UserReservesQuery>,
) -> Result<Json<Vec<ProtocolUserReserves>>, ApiError> {
    let user = require_address(query.address.as_deref(), "address")?;
    let reserves = state
        .service
        .user_reserves(user)
        .await
        .map_err(api_error)?;
    Ok(Json(reserves))
}
