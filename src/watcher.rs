use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use crate::alert_gate::GateConfig;
use crate::dispatcher::{DispatchStats, TickDispatcher};
use crate::feed::{resolve_subscriptions, MarketFeed, TickBatch};
use crate::notifier::{spawn_worker, NotificationSink};
use crate::symbols::SymbolRegistry;

const NOTIFY_DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Flip `shutdown` once `signal` resolves.
///
/// A failed signal listener is logged and the sender is dropped without
/// requesting shutdown; the watcher then runs until the feed ends.
pub async fn forward_shutdown<S>(signal: S, shutdown: watch::Sender<bool>)
where
    S: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Ctrl+C received");
            let _ = shutdown.send(true);
        }
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

/// Startup wiring: subscribe the feed, start delivery, and consume batches
/// until shutdown.
pub struct Watcher {
    registry: SymbolRegistry,
    gate: GateConfig,
    sink: Option<Arc<dyn NotificationSink>>,
    batch_queue: usize,
    notify_queue: usize,
    echo: Option<Box<dyn Write + Send>>,
}

impl Watcher {
    pub fn new(registry: SymbolRegistry, gate: GateConfig) -> Self {
        Self {
            registry,
            gate,
            sink: None,
            batch_queue: 256,
            notify_queue: 64,
            echo: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_queues(mut self, batch_queue: usize, notify_queue: usize) -> Self {
        self.batch_queue = batch_queue.max(1);
        self.notify_queue = notify_queue.max(1);
        self
    }

    /// Local echo target; stdout when unset.
    pub fn with_echo(mut self, echo: Box<dyn Write + Send>) -> Self {
        self.echo = Some(echo);
        self
    }

    /// Run until `shutdown` flips to `true` or the feed stops.
    ///
    /// Subscription failure is returned as an error. Shutdown is only observed
    /// between batches.
    pub async fn run<F>(self, mut feed: F, mut shutdown: watch::Receiver<bool>) -> Result<DispatchStats>
    where
        F: MarketFeed + 'static,
    {
        if self.registry.is_empty() {
            tracing::warn!("No symbols loaded; exiting");
            return Ok(DispatchStats::default());
        }

        let subscriptions = resolve_subscriptions(&self.registry);
        for sub in &subscriptions {
            tracing::debug!(
                symbol = %sub.symbol,
                exchange = %sub.exchange,
                currency = %sub.currency,
                sec_type = %sub.sec_type,
                "Resolved subscription"
            );
        }
        let handle = feed
            .subscribe(&subscriptions)
            .await
            .context("feed subscription failed")?;
        tracing::info!(feed = %handle.feed, count = handle.symbols.len(), "Subscribed");

        let (notifier, notify_task) = match self.sink {
            Some(sink) => {
                let (handle, task) = spawn_worker(sink, self.notify_queue);
                (Some(handle), Some(task))
            }
            None => (None, None),
        };

        let mut dispatcher = TickDispatcher::new(self.gate, self.registry, notifier);
        if let Some(echo) = self.echo {
            dispatcher = dispatcher.with_echo(echo);
        }

        let (batch_tx, mut batch_rx) = mpsc::channel::<TickBatch>(self.batch_queue);
        let feed_shutdown = shutdown.clone();
        let feed_task = tokio::spawn(async move {
            if let Err(e) = feed.run(batch_tx, feed_shutdown).await {
                tracing::error!(error = %e, "Feed failed");
            }
        });

        tracing::info!("Listening for price updates. Ctrl+C to stop.");
        let mut shutdown_open = true;
        loop {
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested");
                break;
            }
            tokio::select! {
                batch = batch_rx.recv() => match batch {
                    Some(batch) => {
                        dispatcher.handle_batch(&batch);
                    }
                    None => {
                        tracing::info!("Feed ended");
                        break;
                    }
                },
                changed = shutdown.changed(), if shutdown_open => {
                    if changed.is_err() {
                        shutdown_open = false;
                    }
                }
            }
        }

        drop(batch_rx);
        if let Err(e) = feed_task.await {
            tracing::warn!(error = %e, "Feed task join failed");
        }

        let stats = dispatcher.stats();
        // Dropping the dispatcher releases the last notifier handle so the
        // worker drains its queue and exits.
        drop(dispatcher);
        if let Some(task) = notify_task {
            match tokio::time::timeout(NOTIFY_DRAIN_TIMEOUT, task).await {
                Ok(Err(e)) => tracing::warn!(error = %e, "Notification worker join failed"),
                Err(_) => tracing::warn!("Timed out draining notifications"),
                Ok(Ok(())) => {}
            }
        }

        tracing::info!(
            batches = stats.batches,
            ticks = stats.ticks,
            accepted = stats.accepted,
            rejected = stats.rejected,
            discarded = stats.discarded,
            unknown = stats.unknown,
            echo_failures = stats.echo_failures,
            notifications_dropped = stats.notifications_dropped,
            "Watcher stopped"
        );
        Ok(stats)
    }
}
