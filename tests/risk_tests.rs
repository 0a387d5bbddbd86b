//! Circuit breaker, kill switch and emergency liquidation.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use warden::domain::{Action, Symbol};
use warden::error::RiskError;
use warden::port::{Broker, Event, PreTradeVerdict};
use warden::testkit::domain::{account, position, strong_history};
use warden::testkit::harness::{Harness, HarnessSettings, SYMBOL};
use warden::testkit::module::ScriptedModule;
use warden::testkit::store::StoreFault;

#[tokio::test]
async fn drawdown_breach_halts_at_first_violation() {
    let harness = Harness::new("acct");
    let id = harness.account_id.clone();

    let mut marks = Vec::new();
    for equity in [dec!(100000), dec!(110000), dec!(104000), dec!(95000)] {
        let state = harness.gate.evaluate(&id, equity).await.unwrap();
        marks.push((state.high_water_mark, state.drawdown_pct, state.trading_enabled));
    }

    let hwms: Vec<Decimal> = marks.iter().map(|(h, _, _)| *h).collect();
    assert_eq!(
        hwms,
        vec![dec!(100000), dec!(110000), dec!(110000), dec!(110000)]
    );
    assert!(marks[0].2 && marks[1].2);
    assert!(!marks[2].2, "104000 is a 5.45% drawdown");
    assert!(!marks[3].2);
    assert_eq!(marks[2].1.round_dp(4), dec!(0.0545));
    assert_eq!(marks[3].1.round_dp(4), dec!(0.1364));

    assert_eq!(
        harness
            .events
            .count(|e| matches!(e, Event::TradingHalted { .. })),
        1
    );
}

#[tokio::test]
async fn drawdown_at_limit_does_not_halt() {
    let harness = Harness::new("acct");
    let id = harness.account_id.clone();
    harness.gate.evaluate(&id, dec!(100000)).await.unwrap();
    let state = harness.gate.evaluate(&id, dec!(95000)).await.unwrap();
    assert_eq!(state.drawdown_pct, dec!(0.05));
    assert!(state.trading_enabled);
}

#[tokio::test]
async fn recovery_does_not_reenable_but_resume_does() {
    let harness = Harness::new("acct");
    let id = harness.account_id.clone();
    harness.gate.evaluate(&id, dec!(100000)).await.unwrap();
    harness.gate.evaluate(&id, dec!(90000)).await.unwrap();

    let recovered = harness.gate.evaluate(&id, dec!(120000)).await.unwrap();
    assert!(!recovered.trading_enabled);
    assert_eq!(recovered.high_water_mark, dec!(120000));
    assert!(matches!(
        harness.gate.ensure_trading_enabled(&id).await,
        Err(RiskError::Halted { .. })
    ));

    harness.gate.evaluate(&id, dec!(90000)).await.unwrap();
    let resumed = harness.gate.resume(&id, "ops", "reviewed").await.unwrap();
    assert!(resumed.trading_enabled);
    assert_eq!(resumed.high_water_mark, dec!(90000));
    assert_eq!(resumed.drawdown_pct, Decimal::ZERO);

    let next = harness.gate.evaluate(&id, dec!(89000)).await.unwrap();
    assert!(next.trading_enabled);
    assert!(harness.gate.ensure_trading_enabled(&id).await.is_ok());
}

#[tokio::test]
async fn resume_without_state_is_refused() {
    let harness = Harness::new("acct");
    let err = harness
        .gate
        .resume(&harness.account_id, "ops", "why not")
        .await
        .unwrap_err();
    assert!(matches!(err, RiskError::StateUnavailable { .. }));
}

#[tokio::test]
async fn unevaluated_account_is_not_tradable() {
    let harness = Harness::new("acct");
    assert!(matches!(
        harness.gate.ensure_trading_enabled(&harness.account_id).await,
        Err(RiskError::StateUnavailable { .. })
    ));
}

#[tokio::test]
async fn kill_switch_blocks_every_account() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let other = warden::domain::AccountId::from("other");
    harness.gate.evaluate(&other, dec!(50000)).await.unwrap();

    harness.gate.halt_all("market closed early").await.unwrap();
    for id in [&harness.account_id, &other] {
        let err = harness.gate.ensure_trading_enabled(id).await.unwrap_err();
        assert!(err.to_string().contains("global kill switch"));
    }

    let decision = harness.signed_decision("AAPL", Action::Buy, dec!(0.01)).await;
    let verdict = harness
        .gate
        .evaluate_pre_trade(&decision, &harness.account().await, dec!(100))
        .await;
    assert!(matches!(verdict, PreTradeVerdict::Deny(RiskError::Halted { .. })));

    harness.gate.resume_all("ops", "all clear").await.unwrap();
    assert!(harness
        .gate
        .ensure_trading_enabled(&harness.account_id)
        .await
        .is_ok());
    assert_eq!(
        harness
            .events
            .count(|e| matches!(e, Event::KillSwitch { .. })),
        2
    );
}

#[tokio::test]
async fn pre_trade_limits() {
    let harness = Harness::new("acct");
    harness.prime().await;
    let snapshot = account("acct", dec!(100000));

    let small = harness.signed_decision("AAPL", Action::Buy, dec!(0.05)).await;
    assert!(matches!(
        harness.gate.evaluate_pre_trade(&small, &snapshot, dec!(100)).await,
        PreTradeVerdict::Allow
    ));

    let concentrated = harness.signed_decision("AAPL", Action::Buy, dec!(0.5)).await;
    assert!(matches!(
        harness
            .gate
            .evaluate_pre_trade(&concentrated, &snapshot, dec!(100))
            .await,
        PreTradeVerdict::Downgrade { .. }
    ));

    let oversized = harness.signed_decision("AAPL", Action::Buy, dec!(0.5)).await;
    assert!(matches!(
        harness
            .gate
            .evaluate_pre_trade(&oversized, &snapshot, dec!(1))
            .await,
        PreTradeVerdict::Deny(RiskError::PositionLimitExceeded { .. })
    ));

    let mut holding = snapshot.clone();
    holding.positions.push(position("AAPL", dec!(300), dec!(100)));
    let close = harness.signed_decision("AAPL", Action::CloseAll, Decimal::ZERO).await;
    assert!(matches!(
        harness.gate.evaluate_pre_trade(&close, &holding, dec!(100)).await,
        PreTradeVerdict::Allow
    ));

    let no_mark = harness.signed_decision("AAPL", Action::Sell, dec!(0.05)).await;
    assert!(matches!(
        harness.gate.evaluate_pre_trade(&no_mark, &snapshot, Decimal::ZERO).await,
        PreTradeVerdict::Deny(RiskError::StateUnavailable { .. })
    ));
}

#[tokio::test]
async fn trade_count_limit_denies() {
    let mut settings = warden::testkit::harness::HarnessSettings::default();
    settings.limits.max_trades_per_period = 2;
    let harness = Harness::with_settings("acct", settings);
    harness.prime().await;
    harness.gate.record_trade(&harness.account_id).await.unwrap();
    harness.gate.record_trade(&harness.account_id).await.unwrap();

    let decision = harness.signed_decision("AAPL", Action::Buy, dec!(0.01)).await;
    let verdict = harness
        .gate
        .evaluate_pre_trade(&decision, &harness.account().await, dec!(100))
        .await;
    assert!(matches!(
        verdict,
        PreTradeVerdict::Deny(RiskError::TradeLimitExceeded { count: 2, limit: 2 })
    ));
}

#[tokio::test]
async fn emergency_liquidation_flattens_and_halts_idempotently() {
    let mut settings = warden::testkit::harness::HarnessSettings::default();
    settings.fill_mode = warden::adapter::outbound::paper::FillMode::Resting;
    let harness = Harness::with_settings("acct", settings);
    harness.prime().await;
    harness
        .broker
        .set_position(position("AAPL", dec!(10), dec!(100)));
    harness
        .broker
        .set_position(position("SPY", dec!(-4), dec!(450)));

    let router = harness.router();
    let decision = harness.signed_decision("AAPL", Action::Buy, dec!(0.01)).await;
    let placed = router.execute(&decision, &harness.account().await).await;
    assert!(placed.is_placed());
    assert_eq!(harness.broker.list_open_orders().await.unwrap().len(), 1);

    let report = harness
        .gate
        .emergency_liquidate(&harness.account_id, harness.broker.as_ref())
        .await
        .unwrap();
    assert_eq!(report.orders_canceled, 1);
    assert_eq!(report.positions_closed, 2);
    assert!(harness.broker.list_positions().await.unwrap().is_empty());
    assert!(harness.broker.list_open_orders().await.unwrap().is_empty());
    assert!(harness
        .gate
        .ensure_trading_enabled(&harness.account_id)
        .await
        .is_err());

    let again = harness
        .gate
        .emergency_liquidate(&harness.account_id, harness.broker.as_ref())
        .await
        .unwrap();
    assert_eq!(again.orders_canceled, 0);
    assert_eq!(again.positions_closed, 0);
    assert!(harness
        .gate
        .ensure_trading_enabled(&harness.account_id)
        .await
        .is_err());
    assert_eq!(
        harness
            .events
            .count(|e| matches!(e, Event::EmergencyLiquidation { .. })),
        2
    );
    let flat = harness.account().await;
    assert_eq!(flat.position_quantity(&Symbol::from("AAPL")), Decimal::ZERO);
}

/// Primed account with tradable history, then `fault` injected into the store.
async fn faulted(fault: StoreFault) -> Harness {
    let mut settings = HarnessSettings::default();
    settings.limits.state_timeout = Duration::from_millis(50);
    let harness = Harness::with_settings("acct", settings);
    harness.seed_history(&strong_history("trend")).await;
    harness.prime().await;
    harness.risk_store.set_fault(fault);
    harness
}

async fn assert_fails_closed(harness: &Harness) {
    let id = harness.account_id.clone();

    let evaluated = harness.gate.evaluate(&id, dec!(100000)).await;
    assert!(
        matches!(evaluated, Err(RiskError::StateUnavailable { .. })),
        "{evaluated:?}"
    );
    let enabled = harness.gate.ensure_trading_enabled(&id).await;
    assert!(
        matches!(enabled, Err(RiskError::StateUnavailable { .. })),
        "{enabled:?}"
    );

    let pipeline = harness.pipeline(vec![Arc::new(ScriptedModule::emitting(
        "trend",
        SYMBOL,
        Action::Buy,
        0.9,
        dec!(0.05),
    ))]);
    let report = pipeline.run_cycle().await.unwrap();

    let reason = report.halted.as_deref().expect("cycle reported as halted");
    assert!(reason.contains("risk state unavailable"), "{reason}");
    assert_eq!(report.placed(), 0);
    assert_eq!(harness.broker.submissions(), 0);
}

#[tokio::test]
async fn erroring_store_fails_closed() {
    let harness = faulted(StoreFault::Fail).await;

    assert_fails_closed(&harness).await;
}

#[tokio::test]
async fn hanging_store_times_out_closed() {
    let harness = faulted(StoreFault::Hang).await;

    let enabled = harness.gate.ensure_trading_enabled(&harness.account_id).await;
    match enabled {
        Err(RiskError::StateUnavailable { reason }) => {
            assert!(reason.contains("timed out after 50 ms"), "{reason}");
        }
        other => panic!("expected a timeout, got {other:?}"),
    }

    tokio::time::timeout(Duration::from_secs(5), assert_fails_closed(&harness))
        .await
        .expect("every store call is bounded");
}

#[tokio::test]
async fn store_recovery_restores_trading() {
    let harness = faulted(StoreFault::Fail).await;
    assert!(harness.gate.ensure_trading_enabled(&harness.account_id).await.is_err());

    harness.risk_store.set_fault(StoreFault::Healthy);

    let state = harness
        .gate
        .ensure_trading_enabled(&harness.account_id)
        .await
        .unwrap();
    assert!(state.trading_enabled);
}
