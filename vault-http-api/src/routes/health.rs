use axum::{Router, routing::get, extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use crate::PortfolioApiState;

pub fn router() -> Router<Arc<PortfolioApiState>> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<Arc<PortfolioApiState>>) -> Json<Value> {
    let tokens: Vec<&str> = state
        .service
        .tokens()
        .tokens()
        .iter()
        .map(|t| t.symbol.as_str())
        .collect();
    Json(json!({
        "status": "ok",
        "vaults": state.service.store().list().await.len(),
        "tokens": tokens,
    }))
}
