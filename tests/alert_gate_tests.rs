use std::time::{Duration, Instant};

use price_watcher::alert_gate::{
    price_change, AlertGate, AlertPhase, AlertState, Decision, GateConfig, Rejection, Thresholds,
};
use price_watcher::model::profile::SymbolProfile;

fn gate(throttle_seconds: f64) -> AlertGate {
    AlertGate::new(GateConfig::new(throttle_seconds, Thresholds::default()))
}

fn tracking(price: f64, at: Instant) -> AlertState {
    let mut state = AlertState::default();
    state.commit(price, at);
    state
}

#[test]
/// Verifies first-tick bootstrap:
/// with no baseline, any finite price passes regardless of thresholds.
fn first_tick_is_accepted_regardless_of_thresholds() {
    let gate = gate(60.0);
    let strict = Thresholds::new(1_000_000.0, 500.0);
    let state = AlertState::default();
    assert_eq!(state.phase(), AlertPhase::NoBaseline);

    for price in [0.0, 0.01, 150.0, -3.5] {
        assert_eq!(gate.evaluate(&state, &strict, price, Instant::now()), Decision::Accept);
    }
}

#[test]
/// Verifies absolute threshold:
/// prev=100.0, min_change_abs=0.5 rejects 100.3 and accepts 100.6.
fn magnitude_gate_uses_absolute_threshold() {
    let gate = gate(0.0);
    let t0 = Instant::now();
    let mut state = tracking(100.0, t0);
    let thresholds = Thresholds::new(0.5, 0.0);

    assert_eq!(
        gate.evaluate(&state, &thresholds, 100.3, t0),
        Decision::Reject(Rejection::BelowAbsThreshold)
    );

    let decision = gate.evaluate(&state, &thresholds, 100.6, t0);
    assert!(decision.accept());
    state.commit(100.6, t0);
    assert_eq!(state.last_accepted_price, Some(100.6));
    assert_eq!(state.phase(), AlertPhase::Tracking);
}

#[test]
/// Verifies percent threshold:
/// prev=100.0, min_change_pct=1.0 rejects a 0.5% move and accepts a 1.5% move.
fn percent_gate_uses_percent_threshold() {
    let gate = gate(0.0);
    let t0 = Instant::now();
    let state = tracking(100.0, t0);
    let thresholds = Thresholds::new(0.0, 1.0);

    assert_eq!(
        gate.evaluate(&state, &thresholds, 100.5, t0),
        Decision::Reject(Rejection::BelowPctThreshold)
    );
    assert_eq!(gate.evaluate(&state, &thresholds, 101.5, t0), Decision::Accept);
    assert_eq!(gate.evaluate(&state, &thresholds, 98.5, t0), Decision::Accept);
}

#[test]
/// Verifies throttle window:
/// accepted at t=0 with throttle=2s, a qualifying tick at t=1 is rejected and at t=3 accepted.
fn throttle_gate_blocks_within_window() {
    let gate = gate(2.0);
    let t0 = Instant::now();
    let state = tracking(100.0, t0);
    let thresholds = Thresholds::new(0.5, 0.0);

    assert_eq!(
        gate.evaluate(&state, &thresholds, 105.0, t0 + Duration::from_secs(1)),
        Decision::Reject(Rejection::Throttled)
    );
    assert_eq!(
        gate.evaluate(&state, &thresholds, 105.0, t0 + Duration::from_secs(3)),
        Decision::Accept
    );
}

#[test]
/// Verifies throttle is independent of magnitude:
/// outside the window, an insignificant move is still rejected.
fn throttle_and_magnitude_must_both_pass() {
    let gate = gate(2.0);
    let t0 = Instant::now();
    let state = tracking(100.0, t0);
    let thresholds = Thresholds::new(0.5, 0.0);

    assert_eq!(
        gate.evaluate(&state, &thresholds, 100.1, t0 + Duration::from_secs(10)),
        Decision::Reject(Rejection::BelowAbsThreshold)
    );
}

#[test]
/// Verifies non-positive throttle disables throttling.
fn zero_or_negative_throttle_disables_throttling() {
    assert!(GateConfig::new(0.0, Thresholds::default()).throttle.is_none());
    assert!(GateConfig::new(-1.0, Thresholds::default()).throttle.is_none());
    assert!(GateConfig::new(f64::NAN, Thresholds::default()).throttle.is_none());

    let gate = gate(0.0);
    let t0 = Instant::now();
    let state = tracking(100.0, t0);
    assert_eq!(gate.evaluate(&state, &Thresholds::default(), 100.01, t0), Decision::Accept);
}

#[test]
/// Verifies zero-baseline safety:
/// prev=0.0 with a percent threshold computes percent as 0 and defers to the absolute threshold.
fn zero_baseline_does_not_divide_by_zero() {
    assert_eq!(price_change(0.0, 5.0), (5.0, 0.0));

    let gate = gate(0.0);
    let t0 = Instant::now();
    let state = tracking(0.0, t0);

    assert_eq!(
        gate.evaluate(&state, &Thresholds::new(0.0, 10.0), 5.0, t0),
        Decision::Accept
    );
    assert_eq!(
        gate.evaluate(&state, &Thresholds::new(6.0, 10.0), 5.0, t0),
        Decision::Reject(Rejection::BelowAbsThreshold)
    );
}

#[test]
/// Verifies zero thresholds alert on any move but not on an unchanged price.
fn zero_thresholds_accept_any_move_but_not_repeat() {
    let gate = gate(0.0);
    let t0 = Instant::now();
    let state = tracking(150.0, t0);
    let zero = Thresholds::new(0.0, 0.0);

    assert_eq!(gate.evaluate(&state, &zero, 150.01, t0), Decision::Accept);
    assert_eq!(
        gate.evaluate(&state, &zero, 150.0, t0),
        Decision::Reject(Rejection::Unchanged)
    );
}

#[test]
/// Verifies rejection idempotence:
/// repeated evaluation of a rejected candidate yields the same decision and never mutates state.
fn rejection_is_idempotent() {
    let gate = gate(5.0);
    let t0 = Instant::now();
    let state = tracking(100.0, t0);
    let snapshot = state;
    let thresholds = Thresholds::new(0.5, 0.0);
    let now = t0 + Duration::from_secs(1);

    let first = gate.evaluate(&state, &thresholds, 100.2, now);
    for _ in 0..5 {
        assert_eq!(gate.evaluate(&state, &thresholds, 100.2, now), first);
    }
    assert_eq!(state, snapshot);
}

#[test]
/// Verifies per-symbol overrides win over global defaults and fall back when unset.
fn profile_overrides_layer_over_defaults() {
    let defaults = Thresholds::new(1.0, 2.0);

    let plain = SymbolProfile::new("AAPL");
    assert_eq!(Thresholds::for_profile(&defaults, &plain), defaults);

    let abs_only = SymbolProfile::new("AAPL").with_thresholds(Some(0.0), None);
    assert_eq!(
        Thresholds::for_profile(&defaults, &abs_only),
        Thresholds::new(0.0, 2.0)
    );
}

#[test]
/// Verifies percent change is measured against the magnitude of a negative baseline.
fn percent_change_uses_absolute_baseline() {
    let (abs_change, pct_change) = price_change(-50.0, -49.0);
    assert!((abs_change - 1.0).abs() < 1e-9);
    assert!((pct_change - 2.0).abs() < 1e-9);
}

#[test]
/// Verifies a throttle too large for `Duration` saturates instead of panicking
/// and keeps blocking every later alert.
fn oversized_throttle_saturates() {
    let config = GateConfig::new(1e20, Thresholds::default());
    assert_eq!(config.throttle, Some(Duration::MAX));

    let gate = AlertGate::new(config);
    let t0 = Instant::now();
    let state = tracking(100.0, t0);
    assert_eq!(
        gate.evaluate(&state, &Thresholds::default(), 200.0, t0 + Duration::from_secs(86_400)),
        Decision::Reject(Rejection::Throttled)
    );
}
