//! Full account cycles and supervisor isolation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;
use warden::application::pipeline::Supervisor;
use warden::application::strategy::DecisionModule;
use warden::domain::{Action, ExecutionStatus, LedgerStatus, OrderSide};
use warden::error::BrokerError;
use warden::port::{Event, LedgerStore, RiskStateStore};
use warden::testkit::domain::{quote, strong_history};
use warden::testkit::harness::{Harness, HarnessSettings, SYMBOL};
use warden::testkit::module::{Behavior, ScriptedModule};

fn buyer(id: &str, symbol: &str) -> Arc<dyn DecisionModule> {
    Arc::new(ScriptedModule::emitting(id, symbol, Action::Buy, 0.9, dec!(0.05)))
}

#[tokio::test]
async fn cycle_places_the_master_decision() {
    let harness = Harness::new("acct");
    harness.seed_history(&strong_history("trend")).await;
    let pipeline = harness.pipeline(vec![buyer("trend", SYMBOL)]);

    let report = pipeline.run_cycle().await.unwrap();

    assert!(report.halted.is_none());
    assert_eq!(report.signals, 1);
    assert_eq!(report.decisions, 1);
    assert_eq!(report.placed(), 1);
    let submitted = harness
        .ledger
        .by_status(LedgerStatus::Submitted)
        .await
        .unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].side, OrderSide::Buy);

    let state = harness
        .risk_store
        .load(&harness.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.trades_in_period, 1);
}

#[tokio::test]
async fn shadow_modules_never_trade() {
    let harness = Harness::new("acct");
    let pipeline = harness.pipeline(vec![buyer("newcomer", SYMBOL)]);

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.signals, 1);
    assert_eq!(report.placed(), 0);
    assert_eq!(harness.broker.submissions(), 0);
}

#[tokio::test]
async fn broken_modules_do_not_stop_the_cycle() {
    let harness = Harness::new("acct");
    harness.seed_history(&strong_history("trend")).await;
    let pipeline = harness.pipeline(vec![
        buyer("trend", SYMBOL),
        Arc::new(ScriptedModule::new(
            "broken",
            SYMBOL,
            Behavior::Fail("feature store offline".into()),
        )),
        Arc::new(ScriptedModule::new("panicky", SYMBOL, Behavior::Panic)),
        Arc::new(ScriptedModule::new(
            "slow",
            SYMBOL,
            Behavior::Sleep(Duration::from_secs(3)),
        )),
    ]);

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.signals, 4);
    assert_eq!(report.placed(), 1);
}

#[tokio::test]
async fn halted_account_skips_the_cycle() {
    let harness = Harness::new("acct");
    harness.seed_history(&strong_history("trend")).await;
    harness.prime().await;
    harness
        .gate
        .halt(&harness.account_id, "maintenance")
        .await
        .unwrap();
    let pipeline = harness.pipeline(vec![buyer("trend", SYMBOL)]);

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.halted.as_deref(), Some("maintenance"));
    assert_eq!(harness.broker.submissions(), 0);
}

#[tokio::test]
async fn losses_trip_the_breaker_before_trading() {
    let harness = Harness::new("acct");
    harness.seed_history(&strong_history("trend")).await;
    harness.prime().await;
    harness.broker.set_cash(dec!(90000));
    let pipeline = harness.pipeline(vec![buyer("trend", SYMBOL)]);

    let report = pipeline.run_cycle().await.unwrap();

    assert!(report.halted.unwrap().contains("drawdown"));
    assert_eq!(harness.broker.submissions(), 0);
    assert_eq!(
        harness
            .events
            .count(|e| matches!(e, Event::TradingHalted { .. })),
        1
    );
}

#[tokio::test]
async fn systemic_sell_off_blocks_buys_in_the_cycle() {
    let harness = Harness::new("acct");
    for (symbol, bid, ask) in [
        ("SPY", dec!(449.95), dec!(450.05)),
        ("QQQ", dec!(379.95), dec!(380.05)),
        ("IWM", dec!(199.99), dec!(200.01)),
    ] {
        harness.market.set_quote(symbol, quote(bid, ask));
    }
    for module in ["s1", "s2", "s3", "trend"] {
        harness.seed_history(&strong_history(module)).await;
    }
    let seller = |id: &str, symbol: &str| -> Arc<dyn DecisionModule> {
        Arc::new(ScriptedModule::emitting(id, symbol, Action::Sell, 0.8, dec!(0.2)))
    };
    let pipeline = harness.pipeline(vec![
        seller("s1", "SPY"),
        seller("s2", "QQQ"),
        seller("s3", "IWM"),
        buyer("trend", SYMBOL),
    ]);

    let report = pipeline.run_cycle().await.unwrap();

    assert!(report.systemic_override);
    let entries = harness
        .ledger
        .by_status(LedgerStatus::Submitted)
        .await
        .unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.side == OrderSide::Sell));
}

#[tokio::test]
async fn supervisor_isolates_a_failing_account() {
    let healthy = Harness::new("healthy");
    healthy.seed_history(&strong_history("trend")).await;
    let broken = Harness::new("broken");
    broken.seed_history(&strong_history("unquoted")).await;

    let supervisor = Supervisor::new(
        vec![
            Arc::new(broken.pipeline(vec![buyer("unquoted", "MSFT")])),
            Arc::new(healthy.pipeline(vec![buyer("trend", SYMBOL)])),
        ],
        Arc::clone(&healthy.notifier),
    );

    let outcomes = supervisor.run_once().await;

    assert_eq!(outcomes.len(), 2);
    let broken_outcome = outcomes
        .iter()
        .find(|o| o.account_id.as_str() == "broken")
        .unwrap();
    assert!(broken_outcome.result.as_ref().unwrap_err().contains("MSFT"));
    let healthy_outcome = outcomes
        .iter()
        .find(|o| o.account_id.as_str() == "healthy")
        .unwrap();
    assert_eq!(healthy_outcome.result.as_ref().unwrap().placed(), 1);
    assert_eq!(
        healthy
            .events
            .count(|e| matches!(e, Event::CycleFailed { .. })),
        1
    );
}

#[tokio::test]
async fn slow_reconciliation_does_not_delay_other_accounts() {
    let mut settings = HarnessSettings::default();
    settings.execution.pending_timeout = chrono::Duration::zero();
    let slow = Harness::with_settings("slow", settings);
    slow.seed_history(&strong_history("trend")).await;
    slow.prime().await;
    slow.broker
        .lose_next_ack(BrokerError::Transient("connection reset".into()));
    let stale = slow.signed_decision(SYMBOL, Action::Buy, dec!(0.01)).await;
    let pending = slow.router().execute(&stale, &slow.account().await).await;
    assert_eq!(pending.status, ExecutionStatus::Pending);
    slow.broker.set_latency(Some(Duration::from_millis(1_000)));

    let healthy = Harness::new("healthy");
    healthy.seed_history(&strong_history("trend")).await;

    let supervisor = Supervisor::new(
        vec![
            Arc::new(slow.pipeline(vec![buyer("trend", SYMBOL)])),
            Arc::new(healthy.pipeline(vec![buyer("trend", SYMBOL)])),
        ],
        Arc::clone(&healthy.notifier),
    );

    let started = Utc::now();
    let outcomes = supervisor.run_once().await;
    assert!(outcomes.iter().all(|o| o.result.is_ok()));

    let placed = healthy
        .ledger
        .by_status(LedgerStatus::Submitted)
        .await
        .unwrap();
    assert_eq!(placed.len(), 1);
    assert!(placed[0].created_at - started < chrono::Duration::milliseconds(500));

    let reconciled = slow
        .ledger
        .get(&pending.intent_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reconciled.status, LedgerStatus::Submitted);
}

#[tokio::test]
async fn supervisor_runs_until_shutdown() {
    let harness = Harness::new("acct");
    harness.seed_history(&strong_history("trend")).await;
    let supervisor = Supervisor::new(
        vec![Arc::new(harness.pipeline(vec![buyer("trend", SYMBOL)]))],
        Arc::clone(&harness.notifier),
    );

    supervisor
        .run(
            Duration::from_millis(10),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;

    assert!(harness.broker.order_count() >= 1);
}
