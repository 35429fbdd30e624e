use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::error::FeedError;
use crate::model::profile::SymbolProfile;
use crate::model::tick::FeedTick;
use crate::symbols::SymbolRegistry;

/// Ticks delivered together by one feed callback/frame.
pub type TickBatch = Vec<FeedTick>;

/// Feed-agnostic description of one tracked instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub symbol: String,
    pub exchange: String,
    pub currency: String,
    pub sec_type: String,
}

impl Subscription {
    pub fn from_profile(profile: &SymbolProfile) -> Self {
        Self {
            symbol: profile.symbol.clone(),
            exchange: profile.exchange.trim().to_ascii_uppercase(),
            currency: profile.currency.trim().to_ascii_uppercase(),
            sec_type: profile.sec_type.trim().to_ascii_uppercase(),
        }
    }
}

/// One subscription per tracked symbol, in registry order.
pub fn resolve_subscriptions(registry: &SymbolRegistry) -> Vec<Subscription> {
    registry.values().map(Subscription::from_profile).collect()
}

/// Returned by a successful [`MarketFeed::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedHandle {
    pub feed: String,
    pub symbols: Vec<String>,
}

/// Source of live tick batches.
///
/// `subscribe` is called once at startup and its failure is fatal. `run` pushes
/// batches into `batches` until `shutdown` flips or the consumer goes away;
/// transient disconnects are the adapter's business.
#[async_trait]
pub trait MarketFeed: Send {
    async fn subscribe(&mut self, subscriptions: &[Subscription]) -> Result<FeedHandle, FeedError>;

    async fn run(
        &mut self,
        batches: mpsc::Sender<TickBatch>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), FeedError>;
}
