//! Integration tests for the hedge action.
//!
//! Tests:
//! 1. Sizing: ratio law, scaled notional, zero exposure vs zero unit exposure
//! 2. Lifecycle: results written only on active dates, calc accounting
//! 3. Ordering: a hedge reading an unmeasured date fails, after measurement it succeeds
//! 4. Failure atomicity: oracle failures leave results untouched

use actionlab_core::domain::{Priceable, RiskMeasure, RiskResult, RiskResults};
use actionlab_core::{
    Action, ActionError, AddTradeAction, BacktestLedger, HedgeAction, TableOracle, TradeDuration,
};
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn delta() -> RiskMeasure {
    RiskMeasure::from("delta")
}

fn vega() -> RiskMeasure {
    RiskMeasure::from("vega")
}

/// Helper: ledger over 2024-01-01..=2024-01-{days} tracking delta and vega.
fn ledger(days: u32) -> BacktestLedger {
    BacktestLedger::new((1..=days).map(|day| d(2024, 1, day)), [delta(), vega()])
}

/// Helper: record an already-measured exposure on `date`.
fn measure(ledger: &mut BacktestLedger, date: NaiveDate, risk: RiskMeasure, value: f64) {
    let mut results = RiskResults::new();
    results.insert(risk, RiskResult::single("book", value));
    ledger.add_results(date, results);
}

fn future_oracle(unit_delta: f64) -> TableOracle {
    TableOracle::new()
        .with_unit_risk("future", "delta", unit_delta)
        .with_unit_risk("future", "vega", 0.5)
}

fn future(notional: f64) -> Priceable {
    Priceable::new("future", notional)
}

/// Helper: delta hedge "h" on a future template, risk requested on the final day.
fn future_hedge(notional: f64, duration: TradeDuration) -> HedgeAction {
    HedgeAction::with_name("h", "delta", future(notional), duration, true)
}

// ──────────────────────────────────────────────
// Sizing
// ──────────────────────────────────────────────

#[test]
fn scenario_b_ratio_and_scaled_notional() {
    // GIVEN ledger exposure 100 on d0 and a template with unit exposure 25
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(4);
    measure(&mut ledger, d0, delta(), 100.0);
    let oracle = future_oracle(25.0);
    let action = future_hedge(1.0, TradeDuration::Open);

    // WHEN the hedge is sized
    let sized = action.size(d0, &ledger, &oracle).unwrap();

    // THEN the ratio is 4 and the notional is scaled by it
    assert_eq!(sized.ratio, 4.0);
    assert_eq!(sized.instrument.notional, 4.0);
    assert_eq!(sized.unit_exposure, 25.0);
    assert_eq!(sized.ledger_exposure, 100.0);
    assert_eq!(sized.instrument.name.as_deref(), Some("h_Priceable0"));
    assert_eq!(sized.instrument.resolved_on, Some(d0));
}

#[test]
fn scaled_notional_follows_template_notional() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(2);
    measure(&mut ledger, d0, delta(), 100.0);
    // unit exposure of a 2-lot template is 2 * 25 = 50 -> ratio 2 -> notional 4
    let action = future_hedge(2.0, TradeDuration::Open);
    let sized = action.size(d0, &ledger, &future_oracle(25.0)).unwrap();
    assert_eq!(sized.ratio, 2.0);
    assert_eq!(sized.instrument.notional, 4.0);
}

#[test]
fn scenario_c_zero_unit_exposure_is_degenerate() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(4);
    measure(&mut ledger, d0, delta(), 100.0);
    let action = future_hedge(1.0, TradeDuration::Open);

    let err = action.apply(&d0.into(), &mut ledger, &future_oracle(0.0)).unwrap_err();
    match err {
        ActionError::DegenerateHedgeRatio { date, risk, unit_exposure } => {
            assert_eq!(date, d0);
            assert_eq!(risk, delta());
            assert_eq!(unit_exposure, 0.0);
        }
        other => panic!("expected degenerate ratio, got {other:?}"),
    }
    assert_eq!(ledger.calc_calls(), 0);
    assert_eq!(ledger.result(d0, &delta()).unwrap().len(), 1);
}

#[test]
fn zero_ledger_exposure_is_a_valid_zero_hedge() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(2);
    measure(&mut ledger, d0, delta(), 0.0);
    let action = future_hedge(1.0, TradeDuration::Open);
    action.apply(&d0.into(), &mut ledger, &future_oracle(25.0)).unwrap();
    assert_eq!(ledger.result(d0, &delta()).unwrap().get("h_Priceable0"), Some(0.0));
}

// ──────────────────────────────────────────────
// Lifecycle and accounting
// ──────────────────────────────────────────────

#[test]
fn hedge_results_written_on_active_dates_only() {
    let (d1, d3) = (d(2024, 1, 2), d(2024, 1, 4));
    let mut ledger = ledger(6);
    measure(&mut ledger, d1, delta(), 50.0);
    let action = future_hedge(1.0, TradeDuration::Until(d3));

    action.apply(&d1.into(), &mut ledger, &future_oracle(25.0)).unwrap();

    for state in ledger.states() {
        let written = ledger.result(*state, &delta()).and_then(|r| r.get("h_Priceable0")).is_some();
        assert_eq!(written, (d1..=d3).contains(state), "state {state}");
    }
    // ratio 2: delta 2 * 25 = 50, vega 2 * 0.5 = 1 on every active date
    assert_eq!(ledger.result(d3, &delta()).unwrap().get("h_Priceable0"), Some(50.0));
    assert_eq!(ledger.exposure(d3, &vega()), Some(1.0));
    // trigger date now holds book + hedge
    assert_eq!(ledger.exposure(d1, &delta()), Some(100.0));
}

#[test]
fn one_calc_call_per_invocation() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(5);
    measure(&mut ledger, d0, delta(), 10.0);
    let oracle = future_oracle(5.0);
    let action = future_hedge(1.0, TradeDuration::Until(d(2024, 1, 3)));

    action.apply(&d0.into(), &mut ledger, &oracle).unwrap();

    // three active dates, two risks
    assert_eq!(ledger.calc_calls(), 1);
    assert_eq!(ledger.calculations(), 6);
    // oracle saw the unit measurement plus the batched recompute
    assert_eq!(oracle.calc_calls(), 2);
    assert_eq!(oracle.resolve_calls(), 1);
}

#[test]
fn final_day_gets_risk_without_flag() {
    // GIVEN a hedge ending on d2 built without risks_on_final_day
    let d0 = d(2024, 1, 1);
    let end = d(2024, 1, 3);
    let mut ledger = ledger(4);
    measure(&mut ledger, d0, delta(), 10.0);
    let action = HedgeAction::with_name(
        "h",
        "delta",
        Priceable::new("future", 1.0),
        TradeDuration::Until(end),
        false,
    );

    // WHEN it fires on d0
    action.apply(&d0.into(), &mut ledger, &future_oracle(5.0)).unwrap();

    // THEN d0..=d2 carry the hedge, the day after does not
    for day in 1..=3 {
        let written = ledger.result(d(2024, 1, day), &delta()).and_then(|r| r.get("h_Priceable0"));
        assert_eq!(written, Some(10.0), "day {day}");
    }
    assert!(ledger.result(d(2024, 1, 4), &delta()).is_none());
    // three active dates, two risks
    assert_eq!(ledger.calculations(), 6);
}

#[test]
fn hedge_does_not_add_positions() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(3);
    measure(&mut ledger, d0, delta(), 10.0);
    let action = future_hedge(1.0, TradeDuration::Open);
    action.apply(&d0.into(), &mut ledger, &future_oracle(5.0)).unwrap();
    assert!(ledger.states().iter().all(|s| ledger.batches(*s).is_empty()));
}

// ──────────────────────────────────────────────
// Ordering
// ──────────────────────────────────────────────

#[test]
fn hedge_before_measurement_fails() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(3);
    let oracle = future_oracle(5.0);
    let add = AddTradeAction::with_name("book", vec![future(20.0)], TradeDuration::Open);
    let hedge = future_hedge(-1.0, TradeDuration::Open);

    // Positions exist but nobody has measured them yet.
    add.apply(&d0.into(), &mut ledger, &oracle).unwrap();
    let err = hedge.apply(&d0.into(), &mut ledger, &oracle).unwrap_err();
    assert_eq!(err, ActionError::MissingExposure { date: d0, risk: delta() });
    assert_eq!(ledger.calc_calls(), 0);
}

#[test]
fn hedge_after_measurement_matches_book_exposure() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(3);
    let oracle = future_oracle(5.0);
    let add = AddTradeAction::with_name("book", vec![future(20.0)], TradeDuration::Open);
    // Short template: the ratio turns negative and the scaled hedge carries the book's sign.
    let hedge = future_hedge(-1.0, TradeDuration::Open);

    add.apply(&d0.into(), &mut ledger, &oracle).unwrap();
    measure(&mut ledger, d0, delta(), 100.0);

    let sized = hedge.size(d0, &ledger, &oracle).unwrap();
    assert!((sized.ratio * sized.unit_exposure - sized.ledger_exposure).abs() < 1e-9);
    assert_eq!(sized.ratio, -20.0);

    hedge.apply(&d0.into(), &mut ledger, &oracle).unwrap();
    let hedge_delta = ledger.result(d0, &delta()).unwrap().get("h_Priceable0").unwrap();
    assert!((hedge_delta - 100.0).abs() < 1e-9);
}

// ──────────────────────────────────────────────
// Failure atomicity
// ──────────────────────────────────────────────

#[test]
fn recompute_failure_writes_nothing() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(4);
    measure(&mut ledger, d0, delta(), 10.0);
    // unit measurement on d0 succeeds, the window recompute touching d2 fails
    let oracle = future_oracle(5.0).failing_calc_on(d(2024, 1, 3));
    let action = future_hedge(1.0, TradeDuration::Open);

    let err = action.apply(&d0.into(), &mut ledger, &oracle).unwrap_err();
    assert!(matches!(err, ActionError::Calculation { .. }));
    assert_eq!(ledger.exposure(d0, &delta()), Some(10.0));
    assert!(ledger.result(d(2024, 1, 2), &delta()).is_none());
}

#[test]
fn resolution_failure_is_fatal() {
    let d0 = d(2024, 1, 1);
    let mut ledger = ledger(2);
    measure(&mut ledger, d0, delta(), 10.0);
    let oracle = future_oracle(5.0).failing_resolution_on(d0);
    let action = future_hedge(1.0, TradeDuration::Open);
    let err = action.apply(&d0.into(), &mut ledger, &oracle).unwrap_err();
    assert!(matches!(err, ActionError::Resolution { .. }));
}
