use std::time::{Duration, Instant};

use crate::model::profile::SymbolProfile;

/// Magnitude thresholds a candidate price must clear relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thresholds {
    /// Minimum absolute move. `0.0` disables the check.
    pub min_change_abs: f64,
    /// Minimum percent move. `0.0` disables the check.
    pub min_change_pct: f64,
}

impl Thresholds {
    pub fn new(min_change_abs: f64, min_change_pct: f64) -> Self {
        Self {
            min_change_abs,
            min_change_pct,
        }
    }

    /// Per-symbol overrides layered over the global defaults.
    pub fn for_profile(defaults: &Thresholds, profile: &SymbolProfile) -> Self {
        Self {
            min_change_abs: profile.min_change_abs.unwrap_or(defaults.min_change_abs),
            min_change_pct: profile.min_change_pct.unwrap_or(defaults.min_change_pct),
        }
    }
}

/// Global gate settings shared by every symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateConfig {
    /// `None` when throttling is disabled.
    pub throttle: Option<Duration>,
    pub defaults: Thresholds,
}

impl GateConfig {
    /// A non-positive or non-finite `throttle_seconds` disables throttling.
    /// Values beyond what `Duration` can hold saturate to `Duration::MAX`.
    pub fn new(throttle_seconds: f64, defaults: Thresholds) -> Self {
        let throttle = if throttle_seconds.is_finite() && throttle_seconds > 0.0 {
            Some(Duration::try_from_secs_f64(throttle_seconds).unwrap_or(Duration::MAX))
        } else {
            None
        };
        Self { throttle, defaults }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    /// No tick has passed the gate yet.
    NoBaseline,
    /// A baseline price exists; terminal for the run.
    Tracking,
}

/// Per-symbol gate memory. Only the dispatcher mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlertState {
    pub last_accepted_price: Option<f64>,
    pub last_accepted_at: Option<Instant>,
}

impl AlertState {
    pub fn phase(&self) -> AlertPhase {
        if self.last_accepted_price.is_some() {
            AlertPhase::Tracking
        } else {
            AlertPhase::NoBaseline
        }
    }

    /// Record an accepted price. Must be applied before the next evaluation
    /// for the same symbol.
    pub fn commit(&mut self, price: f64, now: Instant) {
        self.last_accepted_price = Some(price);
        self.last_accepted_at = Some(now);
    }
}

/// Why a candidate price did not pass the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unchanged,
    BelowAbsThreshold,
    BelowPctThreshold,
    Throttled,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "gate.unchanged",
            Self::BelowAbsThreshold => "gate.below_abs_threshold",
            Self::BelowPctThreshold => "gate.below_pct_threshold",
            Self::Throttled => "gate.throttled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(Rejection),
}

impl Decision {
    pub fn accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Distance of `price` from `prev` as `(absolute, percent)`.
///
/// Percent is measured against `|prev|` and is `0.0` when `prev == 0`.
pub fn price_change(prev: f64, price: f64) -> (f64, f64) {
    let abs_change = (price - prev).abs();
    let pct_change = if prev == 0.0 {
        0.0
    } else {
        abs_change / prev.abs() * 100.0
    };
    (abs_change, pct_change)
}

/// Pure accept/reject decision for one candidate price.
#[derive(Debug, Clone, Copy)]
pub struct AlertGate {
    config: GateConfig,
}

impl AlertGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluate `price` at `now` against `state` and `thresholds`.
    ///
    /// Magnitude and throttle are checked independently; both must pass.
    /// The first price for a symbol skips the magnitude check. Nothing is
    /// mutated here; on [`Decision::Accept`] the caller commits via
    /// [`AlertState::commit`].
    pub fn evaluate(
        &self,
        state: &AlertState,
        thresholds: &Thresholds,
        price: f64,
        now: Instant,
    ) -> Decision {
        if let Some(prev) = state.last_accepted_price {
            let (abs_change, pct_change) = price_change(prev, price);
            if abs_change == 0.0 {
                return Decision::Reject(Rejection::Unchanged);
            }
            if abs_change < thresholds.min_change_abs {
                return Decision::Reject(Rejection::BelowAbsThreshold);
            }
            // A zero baseline has no meaningful percent move; only the
            // absolute threshold applies.
            if prev != 0.0
                && thresholds.min_change_pct > 0.0
                && pct_change < thresholds.min_change_pct
            {
                return Decision::Reject(Rejection::BelowPctThreshold);
            }
        }

        if let (Some(throttle), Some(last_at)) = (self.config.throttle, state.last_accepted_at) {
            if now.saturating_duration_since(last_at) < throttle {
                return Decision::Reject(Rejection::Throttled);
            }
        }

        Decision::Accept
    }
}
