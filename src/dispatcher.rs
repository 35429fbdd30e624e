use std::collections::HashMap;
use std::io::Write;
use std::time::Instant;

use crate::alert_gate::{AlertGate, AlertState, Decision, GateConfig, Rejection, Thresholds};
use crate::error::DispatchError;
use crate::model::profile::SymbolProfile;
use crate::model::tick::FeedTick;
use crate::notifier::NotifierHandle;
use crate::symbols::SymbolRegistry;

/// What happened to a single tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Accepted { message: String },
    Rejected(Rejection),
    /// No finite price on the tick.
    Discarded,
    /// Symbol is outside the tracked set.
    UnknownSymbol,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub batches: u64,
    pub ticks: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub discarded: u64,
    pub unknown: u64,
    /// Accepted alerts whose local echo could not be written.
    pub echo_failures: u64,
    pub notifications_dropped: u64,
}

/// Alert text for an accepted price.
pub fn format_alert(profile: &SymbolProfile, price: f64) -> String {
    format!(
        "💹 **{}** last price: **{:.4}**",
        profile.display_label(),
        price
    )
}

/// Owns the per-symbol [`AlertState`] store and turns tick batches into alerts.
///
/// Meant to be driven by a single consumer; batches are processed to completion
/// one at a time.
pub struct TickDispatcher {
    gate: AlertGate,
    profiles: SymbolRegistry,
    states: HashMap<String, AlertState>,
    notifier: Option<NotifierHandle>,
    echo: Box<dyn Write + Send>,
    stats: DispatchStats,
}

impl TickDispatcher {
    /// Alerts are echoed to stdout and, if `notifier` is set, queued for delivery.
    pub fn new(config: GateConfig, profiles: SymbolRegistry, notifier: Option<NotifierHandle>) -> Self {
        let states = profiles
            .keys()
            .map(|sym| (sym.clone(), AlertState::default()))
            .collect();
        Self {
            gate: AlertGate::new(config),
            profiles,
            states,
            notifier,
            echo: Box::new(std::io::stdout()),
            stats: DispatchStats::default(),
        }
    }

    /// Replace the local echo target.
    pub fn with_echo(mut self, echo: Box<dyn Write + Send>) -> Self {
        self.echo = echo;
        self
    }

    pub fn state(&self, symbol: &str) -> Option<&AlertState> {
        self.states.get(symbol)
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn tracked_symbols(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Process a batch in order, gating each tick at its receipt instant.
    pub fn handle_batch(&mut self, ticks: &[FeedTick]) -> Vec<TickOutcome> {
        self.run_batch(ticks, |tick| tick.received_at)
    }

    /// Process a batch in order as if every tick arrived at `now`.
    pub fn handle_batch_at(&mut self, ticks: &[FeedTick], now: Instant) -> Vec<TickOutcome> {
        self.run_batch(ticks, |_| now)
    }

    fn run_batch(&mut self, ticks: &[FeedTick], clock: impl Fn(&FeedTick) -> Instant) -> Vec<TickOutcome> {
        self.stats.batches += 1;
        let mut outcomes = Vec::with_capacity(ticks.len());
        for tick in ticks {
            self.stats.ticks += 1;
            let outcome = self.process_tick(tick, clock(tick));
            match &outcome {
                TickOutcome::Accepted { .. } => self.stats.accepted += 1,
                TickOutcome::Rejected(_) => self.stats.rejected += 1,
                TickOutcome::Discarded => self.stats.discarded += 1,
                TickOutcome::UnknownSymbol => self.stats.unknown += 1,
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Gate one tick and, on acceptance, commit state and emit the alert.
    ///
    /// Rejected and discarded ticks leave state untouched and emit nothing.
    /// A failed local echo is logged and counted; the tick stays accepted.
    pub fn process_tick(&mut self, tick: &FeedTick, now: Instant) -> TickOutcome {
        let Some(profile) = self.profiles.get(&tick.symbol) else {
            tracing::debug!(symbol = %tick.symbol, "Ignoring tick for untracked symbol");
            return TickOutcome::UnknownSymbol;
        };
        let Some(price) = tick.effective_price() else {
            return TickOutcome::Discarded;
        };

        let thresholds = Thresholds::for_profile(&self.gate.config().defaults, profile);
        let state = self.states.entry(tick.symbol.clone()).or_default();

        match self.gate.evaluate(state, &thresholds, price, now) {
            Decision::Reject(reason) => {
                tracing::trace!(symbol = %tick.symbol, price, reason = reason.as_str(), "Tick rejected");
                TickOutcome::Rejected(reason)
            }
            Decision::Accept => {
                state.commit(price, now);
                let message = format_alert(profile, price);
                tracing::info!(
                    symbol = %tick.symbol,
                    price,
                    received_at_ms = tick.received_at_ms,
                    "Alert"
                );

                if let Some(notifier) = &self.notifier {
                    if !notifier.try_notify(message.clone()) {
                        self.stats.notifications_dropped += 1;
                    }
                }
                if let Err(e) = self.echo_line(&message) {
                    self.stats.echo_failures += 1;
                    tracing::warn!(symbol = %tick.symbol, error = %e, "Alert echo failed");
                }

                TickOutcome::Accepted { message }
            }
        }
    }

    fn echo_line(&mut self, message: &str) -> Result<(), DispatchError> {
        writeln!(self.echo, "{}", message)?;
        self.echo.flush()?;
        Ok(())
    }
}
