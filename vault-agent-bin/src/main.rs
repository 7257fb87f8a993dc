//! Runner for the portfolio vault agent.
//!
//! Loads configuration from the environment, connects the runtime to the
//! vault chain, the lending markets and the LLM endpoint, then serves the
//! HTTP API until interrupted.

mod config;

use std::sync::Arc;

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::Context;
use vault_http_api::{PortfolioApiState, build_router};
use vault_runtime::adapters::aave_v3::AaveV3RateSource;
use vault_runtime::adapters::compound_v3::CompoundV3RateSource;
use vault_runtime::chain::ChainClient;
use vault_runtime::interpreter::OpenAiInterpreter;
use vault_runtime::{PortfolioService, ServiceParts};

use crate::config::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_log();

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        chain_id = config.chain_id,
        factory = %config.factory_address,
        tokens = config.tokens.tokens().len(),
        "Starting vault agent"
    );

    // ── 1. Chain client (vault reads, factory, action execution) ─────────
    let chain = Arc::new(
        ChainClient::new(&config.rpc_url, &config.private_key, config.chain_id)?
            .with_factory(config.factory_address)
            .with_confirmation_timeout(config.confirmation_timeout),
    );

    // ── 2. Rate sources ──────────────────────────────────────────────────
    let rates_provider = if config.rates_rpc_url == config.rpc_url {
        chain.read_provider()
    } else {
        let url = config
            .rates_rpc_url
            .parse()
            .context("RATES_RPC_URL is not a valid URL")?;
        ProviderBuilder::new().connect_http(url).erased()
    };
    let aave = AaveV3RateSource::with_pool(rates_provider.clone(), config.aave_pool);
    let compound = CompoundV3RateSource::new(rates_provider, config.compound_markets.clone());

    // ── 3. Strategy interpreter ──────────────────────────────────────────
    let interpreter = OpenAiInterpreter::new(
        config.llm_api_key.clone(),
        config.llm_model.clone(),
        config.llm_endpoint.clone(),
        Some(config.llm_timeout),
    )?;
    tracing::info!(model = interpreter.model(), "LLM interpreter ready");

    let service = PortfolioService::new(ServiceParts {
        tokens: config.tokens.clone(),
        reader: chain.clone(),
        sender: chain.clone(),
        factory: chain,
        rate_sources: vec![Arc::new(aave), Arc::new(compound)],
        interpreter: Arc::new(interpreter),
    });

    if config.api_token.is_none() {
        tracing::warn!("API_TOKEN not set, HTTP API is unauthenticated");
    }

    // ── 4. HTTP API ──────────────────────────────────────────────────────
    let router = build_router(Arc::new(PortfolioApiState {
        service,
        api_token: config.api_token.clone(),
    }));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("API bind failed on {}", config.bind_addr))?;
    tracing::info!("Vault agent API listening on {}", config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down vault agent");
        })
        .await?;

    Ok(())
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}
