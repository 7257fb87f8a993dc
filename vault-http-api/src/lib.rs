pub mod auth;
pub mod routes;

use std::sync::Arc;

use alloy::primitives::Address;
use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use vault_runtime::{PortfolioError, PortfolioService, ValidationError};

pub struct PortfolioApiState {
    pub service: PortfolioService,
    /// Bearer token required on every route but `/health`. `None` disables auth.
    pub api_token: Option<String>,
}

pub type ApiError = (StatusCode, String);

pub fn build_router(state: Arc<PortfolioApiState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::strategy::router())
        .merge(routes::apply::router())
        .merge(routes::confirm::router())
        .merge(routes::vault::router())
        .merge(routes::reserves::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Map a runtime error onto an HTTP status and message.
pub(crate) fn api_error(e: PortfolioError) -> ApiError {
    let status = match &e {
        PortfolioError::VaultNotFound(_) | PortfolioError::StrategyMissing(_) => {
            StatusCode::NOT_FOUND
        }
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    }
    (status, e.to_string())
}

/// Parse a required address field from a request body or query.
pub(crate) fn require_address(
    value: Option<&str>,
    field: &'static str,
) -> Result<Address, ApiError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| api_error(ValidationError::MissingRequestField(field).into()))?;
    raw.parse::<Address>()
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid {field} '{raw}': {e}")))
}
