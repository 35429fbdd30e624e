use std::time::Instant;

/// One price observation as delivered by a market feed.
///
/// Feeds differ in which fields they can fill, so both prices are optional.
/// The dispatcher only ever looks at [`FeedTick::effective_price`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeedTick {
    pub symbol: String,
    /// Last traded price.
    pub last_price: Option<f64>,
    /// Feed's own notion of the current market price (e.g. bid/ask midpoint).
    pub market_price: Option<f64>,
    /// Wall-clock receipt time in milliseconds since the epoch.
    pub received_at_ms: u64,
    /// Monotonic receipt time; the throttle window is measured against it.
    pub received_at: Instant,
}

impl FeedTick {
    pub fn new(symbol: &str, last_price: Option<f64>, market_price: Option<f64>) -> Self {
        Self {
            symbol: symbol.trim().to_ascii_uppercase(),
            last_price,
            market_price,
            received_at_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
            received_at: Instant::now(),
        }
    }

    /// Override the monotonic receipt time.
    pub fn received(mut self, at: Instant) -> Self {
        self.received_at = at;
        self
    }

    /// Tick carrying only a last-traded price.
    pub fn last(symbol: &str, price: f64) -> Self {
        Self::new(symbol, Some(price), None)
    }

    /// Price the alert gate should see: the last price if finite, else the
    /// fallback market price if finite, else `None` (tick is discarded).
    pub fn effective_price(&self) -> Option<f64> {
        self.last_price
            .filter(|p| p.is_finite())
            .or_else(|| self.market_price.filter(|p| p.is_finite()))
    }
}
