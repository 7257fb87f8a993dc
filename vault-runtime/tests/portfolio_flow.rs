//! Strategy → reconcile → execute flow against in-memory chain doubles.

mod common;

use std::sync::Arc;

use common::*;
use vault_runtime::executor::ActionOutcome;
use vault_runtime::interpreter::{DEFAULT_MODEL, OpenAiInterpreter};
use vault_runtime::{
    ActionKind, PortfolioError, Protocol, RiskLevel, StrategyAction, VaultStatus,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn lend(asset: &str, amount: &str, protocol: Protocol) -> StrategyAction {
    StrategyAction {
        asset: asset.into(),
        current_amount: "0".into(),
        target_amount: amount.into(),
        action: ActionKind::LendTokens,
        protocol,
        pair: None,
    }
}

#[tokio::test]
async fn conservative_description_lends_idle_usdc_to_best_rate() {
    let llm = MockServer::start().await;
    let reply = format!("```json\n{}\n```", conservative_json());
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": reply } }]
        })))
        .expect(1)
        .mount(&llm)
        .await;

    let interpreter = OpenAiInterpreter::new("test-key", DEFAULT_MODEL, llm.uri(), None).unwrap();
    let chain = MockChain::new();
    chain.existing_vault(OWNER, VAULT);
    chain.set_idle(usdc(), 500);
    let service = service(chain.clone(), 5.0, 3.0, Arc::new(interpreter));

    let strategy = service
        .create_strategy(OWNER, "conservative strategy, stablecoins only, min 4% APY")
        .await
        .unwrap();
    assert_eq!(strategy.risk_level, RiskLevel::Conservative);
    assert!(strategy.preferences.stablecoins_only);
    assert_eq!(strategy.preferences.minimum_apy, Some(4.0));

    let proposal = service.apply_strategy(OWNER).await.unwrap();
    assert_eq!(proposal.suggested_actions, vec![lend("USDC", "500", Protocol::Aave)]);

    let report = service
        .confirm_strategy(OWNER, &proposal.suggested_actions)
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.summaries(), vec!["Successfully lent 500 USDC to aave"]);
    assert_eq!(chain.entries(), vec!["send#0 lend:aave:500", "confirm#0"]);

    let record = service.vault(OWNER).await.unwrap();
    assert_eq!(record.status, VaultStatus::Active);
    assert_eq!(record.vault_address, VAULT);
}

#[tokio::test]
async fn second_action_not_attempted_when_first_confirmation_fails() {
    let chain = MockChain::new();
    chain.existing_vault(OWNER, VAULT);
    chain.fail_confirmation_at(0);
    let service = service(
        chain.clone(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );
    let before = service.vault(OWNER).await.unwrap();

    let actions = vec![
        lend("USDC", "100", Protocol::Compound),
        lend("ETH", "1", Protocol::Aave),
    ];
    let report = service.confirm_strategy(OWNER, &actions).await.unwrap();

    assert!(matches!(report.outcomes[0], ActionOutcome::Failed { .. }));
    assert!(matches!(report.outcomes[1], ActionOutcome::NotAttempted { .. }));
    assert!(report.failure().unwrap().contains("confirmation timed out"));
    assert_eq!(chain.entries(), vec!["send#0 lend:compound:100", "fail#0"]);

    let after = service.vault(OWNER).await.unwrap();
    assert_eq!(after.status, VaultStatus::Created);
    assert_eq!(after.last_updated, before.last_updated);
}

#[tokio::test]
async fn actions_are_sent_only_after_previous_confirmation() {
    let chain = MockChain::new();
    chain.existing_vault(OWNER, VAULT);
    let service = service(
        chain.clone(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );

    let actions = vec![
        lend("USDC", "100", Protocol::Compound),
        lend("ETH", "7", Protocol::Aave),
        lend("USDC", "1", Protocol::Aave),
    ];
    let report = service.confirm_strategy(OWNER, &actions).await.unwrap();
    assert_eq!(report.succeeded(), 3);
    assert_eq!(
        chain.entries(),
        vec![
            "send#0 lend:compound:100",
            "confirm#0",
            "send#1 lend:aave:7",
            "confirm#1",
            "send#2 lend:aave:1",
            "confirm#2",
        ]
    );
}

#[tokio::test]
async fn partial_batch_keeps_status_but_refreshes_timestamp() {
    let chain = MockChain::new();
    chain.existing_vault(OWNER, VAULT);
    chain.fail_confirmation_at(1);
    let service = service(
        chain.clone(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );
    let before = service.vault(OWNER).await.unwrap();

    let actions = vec![
        lend("USDC", "100", Protocol::Compound),
        lend("USDC", "5", Protocol::Aave),
    ];
    let report = service.confirm_strategy(OWNER, &actions).await.unwrap();
    assert_eq!(report.succeeded(), 1);

    let after = service.vault(OWNER).await.unwrap();
    assert_eq!(after.status, VaultStatus::Created);
    assert!(after.last_updated >= before.last_updated);
}

#[tokio::test]
async fn failed_batch_never_moves_active_vault_back() {
    let chain = MockChain::new();
    chain.existing_vault(OWNER, VAULT);
    let service = service(
        chain.clone(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );

    service
        .confirm_strategy(OWNER, &[lend("USDC", "1", Protocol::Aave)])
        .await
        .unwrap();
    assert_eq!(service.vault(OWNER).await.unwrap().status, VaultStatus::Active);

    chain.fail_confirmation_at(1);
    let report = service
        .confirm_strategy(OWNER, &[lend("USDC", "2", Protocol::Aave)])
        .await
        .unwrap();
    assert!(!report.is_complete());
    assert_eq!(service.vault(OWNER).await.unwrap().status, VaultStatus::Active);
}

#[tokio::test]
async fn fully_deployed_vault_yields_no_actions() {
    let chain = MockChain::new();
    chain.existing_vault(OWNER, VAULT);
    chain.set_balance(
        usdc(),
        vault_runtime::balances::VaultAssetStruct {
            in_compound: alloy::primitives::U256::from(1_000u64),
            ..Default::default()
        },
    );
    let service = service(
        chain,
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );
    service.create_strategy(OWNER, "keep it safe").await.unwrap();

    let proposal = service.apply_strategy(OWNER).await.unwrap();
    assert!(proposal.suggested_actions.is_empty());
    assert_eq!(proposal.current_portfolio.assets.len(), 2);
}

#[tokio::test]
async fn create_vault_is_idempotent() {
    let chain = MockChain::new();
    let service = service(
        chain.clone(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );

    let first = service.create_vault(OWNER, None).await.unwrap();
    assert!(first.tx_hash.is_some());
    let second = service.create_vault(OWNER, None).await.unwrap();
    assert!(second.tx_hash.is_none());
    assert_eq!(first.record.vault_address, second.record.vault_address);
    assert_eq!(chain.deployments(), 1);
}

#[tokio::test]
async fn concurrent_create_vault_deploys_once() {
    let chain = MockChain::new();
    let service = Arc::new(service(
        chain.clone(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    ));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.create_vault(OWNER, None).await })
        })
        .collect();

    let mut addresses = Vec::new();
    for task in tasks {
        addresses.push(task.await.unwrap().unwrap().record.vault_address);
    }
    addresses.dedup();
    assert_eq!(addresses.len(), 1);
    assert_eq!(chain.deployments(), 1);
}

#[tokio::test]
async fn existing_onchain_vault_is_adopted() {
    let chain = MockChain::new();
    chain.existing_vault(OWNER, VAULT);
    let service = service(
        chain.clone(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );

    let created = service.create_vault(OWNER, None).await.unwrap();
    assert_eq!(created.record.vault_address, VAULT);
    assert!(created.tx_hash.is_none());
    assert_eq!(chain.deployments(), 0);
}

#[tokio::test]
async fn apply_requires_vault_and_strategy() {
    let chain = MockChain::new();
    let service = service(
        chain.clone(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );
    assert!(matches!(
        service.apply_strategy(OWNER).await,
        Err(PortfolioError::VaultNotFound(_))
    ));

    chain.existing_vault(OWNER, VAULT);
    assert!(matches!(
        service.apply_strategy(OWNER).await,
        Err(PortfolioError::StrategyMissing(_))
    ));
}

#[tokio::test]
async fn invalid_llm_strategy_is_rejected() {
    let mut bad = conservative_json();
    bad["allocations"]["liquidity"] = serde_json::json!(30);
    let service = service(MockChain::new(), 3.2, 4.1, Arc::new(CannedInterpreter(bad)));

    let err = service.create_strategy(OWNER, "go wild").await.unwrap_err();
    assert!(matches!(err, PortfolioError::LlmParse(_)));
    assert!(service.store().strategy(OWNER).await.is_none());
}

#[tokio::test]
async fn user_reserves_omit_protocols_without_positions() {
    let service = service(
        MockChain::new(),
        3.2,
        4.1,
        Arc::new(CannedInterpreter(conservative_json())),
    );
    assert!(service.user_reserves(OWNER).await.unwrap().is_empty());
}
