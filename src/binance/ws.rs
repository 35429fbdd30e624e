use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use super::types::parse_ticker_frame;
use crate::error::FeedError;
use crate::feed::{FeedHandle, MarketFeed, Subscription, TickBatch};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Exponential backoff for reconnection.
struct ExponentialBackoff {
    current: Duration,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            initial,
            max,
            factor,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Combined-stream URL for the `@ticker` stream of every subscription.
pub fn ticker_stream_url(ws_base_url: &str, subscriptions: &[Subscription]) -> String {
    let streams = subscriptions
        .iter()
        .map(|s| format!("{}@ticker", s.symbol.to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/stream?streams={}", ws_base_url.trim_end_matches('/'), streams)
}

/// Live ticker feed over Binance's combined WebSocket stream.
///
/// Each text frame becomes one [`TickBatch`].
pub struct BinanceTickerFeed {
    ws_base_url: String,
    url: Option<String>,
    stream: Option<WsStream>,
    backoff: ExponentialBackoff,
}

impl BinanceTickerFeed {
    pub fn new(ws_base_url: &str) -> Self {
        Self {
            ws_base_url: ws_base_url.to_string(),
            url: None,
            stream: None,
            backoff: ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), 2.0),
        }
    }

    async fn connect(url: &str) -> Result<WsStream, FeedError> {
        let (ws_stream, _resp) = tokio_tungstenite::connect_async(url).await?;
        Ok(ws_stream)
    }

    /// Wait out the backoff delay and reconnect. Returns `None` on shutdown.
    async fn reconnect(&mut self, url: &str, shutdown: &mut watch::Receiver<bool>) -> Option<WsStream> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let delay = self.backoff.next_delay();
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting feed");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => return None,
            }
            match Self::connect(url).await {
                Ok(stream) => {
                    self.backoff.reset();
                    tracing::info!("Feed reconnected");
                    return Some(stream);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Feed reconnect failed");
                }
            }
        }
    }

    /// Read frames until the stream ends, errors, or shutdown is requested.
    /// Returns `Ok(true)` when the loop should stop for good.
    async fn read_loop(
        stream: &mut WsStream,
        batches: &mpsc::Sender<TickBatch>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<bool, FeedError> {
        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            let batch = match parse_ticker_frame(&text) {
                                Ok(batch) => batch,
                                Err(e) => {
                                    tracing::debug!(error = %e, "Failed to parse WS message");
                                    continue;
                                }
                            };
                            if batch.is_empty() {
                                continue;
                            }
                            match batches.try_send(batch) {
                                Ok(()) => {}
                                Err(TrySendError::Full(_)) => {
                                    tracing::warn!("Batch channel full, dropping batch");
                                }
                                Err(TrySendError::Closed(_)) => return Ok(true),
                            }
                        }
                        Some(Ok(tungstenite::Message::Close(_))) => {
                            tracing::warn!("Feed closed by server");
                            return Ok(false);
                        }
                        // tokio-tungstenite answers pings itself
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(false),
                    }
                }
                _ = shutdown.changed() => return Ok(true),
            }
        }
    }
}

#[async_trait]
impl MarketFeed for BinanceTickerFeed {
    async fn subscribe(&mut self, subscriptions: &[Subscription]) -> Result<FeedHandle, FeedError> {
        if subscriptions.is_empty() {
            return Err(FeedError::NoSubscriptions);
        }
        let url = ticker_stream_url(&self.ws_base_url, subscriptions);
        tracing::info!(url = %url, "Connecting to feed");

        self.stream = Some(Self::connect(&url).await?);
        self.url = Some(url);
        tracing::info!(count = subscriptions.len(), "Feed connected");

        Ok(FeedHandle {
            feed: "binance".to_string(),
            symbols: subscriptions.iter().map(|s| s.symbol.clone()).collect(),
        })
    }

    async fn run(
        &mut self,
        batches: mpsc::Sender<TickBatch>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), FeedError> {
        let url = self.url.clone().ok_or(FeedError::NotSubscribed)?;

        loop {
            let mut stream = match self.stream.take() {
                Some(stream) => stream,
                None => match self.reconnect(&url, &mut shutdown).await {
                    Some(stream) => stream,
                    None => break,
                },
            };

            let stop = match Self::read_loop(&mut stream, &batches, &mut shutdown).await {
                Ok(stop) => stop,
                Err(e) => {
                    tracing::warn!(error = %e, "Feed read error");
                    false
                }
            };

            if stop {
                if let Err(e) = stream.close(None).await {
                    tracing::debug!(error = %e, "Feed close failed");
                }
                break;
            }
        }

        tracing::info!("Feed stopped");
        Ok(())
    }
}
