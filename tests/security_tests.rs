//! Unsigned, tampered and replayed decisions never reach the broker.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;
use warden::domain::{
    Action, AgentMode, ExecutionStatus, ModuleId, OrchestratedDecision, RoutingDecision,
};
use warden::port::Event;
use warden::testkit::domain::signal;
use warden::testkit::harness::{Harness, HarnessSettings, SYMBOL};

fn violations(harness: &Harness) -> usize {
    harness
        .events
        .count(|e| matches!(e, Event::SecurityViolation { .. }))
}

#[tokio::test]
async fn unsigned_decision_is_rejected() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let decision = OrchestratedDecision::unsigned(
        signal("orchestrator", SYMBOL, Action::Buy, 0.9, dec!(0.05)),
        1.0,
    );

    let result = harness
        .router()
        .execute(&decision, &harness.account().await)
        .await;

    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert_eq!(result.routing_decision, RoutingDecision::None);
    assert!(result.intent_id.is_none());
    assert_eq!(harness.broker.submissions(), 0);
    assert!(harness.ledger.is_empty());
    assert_eq!(violations(&harness), 1);
}

#[tokio::test]
async fn tampered_allocation_is_rejected() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let mut decision = harness.signed_decision(SYMBOL, Action::Buy, dec!(0.01)).await;
    decision.signal.target_allocation = dec!(0.9);

    let result = harness
        .router()
        .execute(&decision, &harness.account().await)
        .await;

    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.reason.unwrap().contains("does not verify"));
    assert_eq!(harness.broker.submissions(), 0);
    assert_eq!(violations(&harness), 1);
}

#[tokio::test]
async fn tampered_action_is_rejected() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let mut decision = harness.signed_decision(SYMBOL, Action::Sell, dec!(0.01)).await;
    decision.signal.action = Action::Buy;

    let result = harness
        .router()
        .execute(&decision, &harness.account().await)
        .await;

    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert_eq!(harness.broker.submissions(), 0);
}

#[tokio::test]
async fn replayed_decision_is_rejected() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let router = harness.router();
    let decision = harness.signed_decision(SYMBOL, Action::Buy, dec!(0.01)).await;

    let first = router.execute(&decision, &harness.account().await).await;
    assert!(first.is_placed());

    let replay = router.execute(&decision, &harness.account().await).await;
    assert_eq!(replay.status, ExecutionStatus::Rejected);
    assert!(replay.reason.unwrap().contains("already used"));
    assert_eq!(harness.broker.submissions(), 1);
    assert_eq!(harness.ledger.len(), 1);
    assert_eq!(violations(&harness), 1);
}

#[tokio::test]
async fn replay_is_caught_across_routers_sharing_a_guard() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let decision = harness.signed_decision(SYMBOL, Action::Buy, dec!(0.01)).await;

    let first = harness
        .router()
        .execute(&decision, &harness.account().await)
        .await;
    assert!(first.is_placed());

    let second = harness
        .router()
        .execute(&decision, &harness.account().await)
        .await;
    assert_eq!(second.status, ExecutionStatus::Rejected);
    assert_eq!(harness.broker.submissions(), 1);
}

#[tokio::test]
async fn signature_by_another_signer_is_rejected() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let mut decision = harness.signed_decision(SYMBOL, Action::Buy, dec!(0.01)).await;
    if let Some(identity) = decision.identity.as_mut() {
        identity.signer_id = "intruder".to_string();
    }

    let result = harness
        .router()
        .execute(&decision, &harness.account().await)
        .await;

    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert_eq!(harness.broker.submissions(), 0);
    assert_eq!(violations(&harness), 1);
}

#[tokio::test]
async fn module_signed_decision_is_not_executable() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let input: BTreeMap<ModuleId, _> = [signal("shadowy", SYMBOL, Action::Buy, 0.9, dec!(0.05))]
        .into_iter()
        .map(|s| (s.module_id.clone(), s))
        .collect();
    let outcome = harness
        .aggregator
        .aggregate(&harness.account_id, &input)
        .await
        .unwrap();
    assert_eq!(outcome.weights[&ModuleId::from("shadowy")].mode, AgentMode::Shadow);
    let module_decision = outcome.module_decisions[0].clone();
    assert!(harness.aggregator.signer().verify(&module_decision).await.is_ok());

    let result = harness
        .router()
        .execute(&module_decision, &harness.account().await)
        .await;

    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.reason.unwrap().contains("may not issue"));
    assert_eq!(harness.broker.submissions(), 0);
    assert!(harness.ledger.is_empty());
    assert_eq!(violations(&harness), 1);
}

#[tokio::test]
async fn redated_decision_is_refused_after_its_nonce_is_pruned() {
    let mut settings = HarnessSettings::default();
    settings.replay_retention = chrono::Duration::milliseconds(200);
    let harness = Harness::with_settings("acct", settings);
    harness.prime().await;
    let router = harness.router();

    let original = harness.signed_decision(SYMBOL, Action::Buy, dec!(0.01)).await;
    assert!(router.execute(&original, &harness.account().await).await.is_placed());

    tokio::time::sleep(Duration::from_millis(400)).await;
    let fresh = harness.signed_decision(SYMBOL, Action::Buy, dec!(0.01)).await;
    assert!(router.execute(&fresh, &harness.account().await).await.is_placed());
    assert_eq!(harness.replay.len(), 1);

    let mut redated = original;
    if let Some(identity) = redated.identity.as_mut() {
        identity.signed_at = Utc::now();
    }
    let result = router.execute(&redated, &harness.account().await).await;

    assert_eq!(result.status, ExecutionStatus::Rejected);
    assert!(result.reason.unwrap().contains("does not verify"));
    assert_eq!(harness.broker.submissions(), 2);
    assert_eq!(violations(&harness), 1);
}
