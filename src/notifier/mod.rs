pub mod discord;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::error::NotifyError;

pub use discord::DiscordWebhookSink;

/// External channel that formatted alerts are delivered to.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Non-blocking front of the delivery worker.
///
/// A full or closed queue drops the message with a warning; the caller never waits.
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<String>,
}

impl NotifierHandle {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Returns `false` if the message was dropped.
    pub fn try_notify(&self, message: String) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Notification queue full, dropping alert");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Notification worker gone, dropping alert");
                false
            }
        }
    }
}

/// Spawn a task that delivers queued messages to `sink` one at a time.
///
/// The task exits once every [`NotifierHandle`] is dropped and the queue is drained.
pub fn spawn_worker(
    sink: Arc<dyn NotificationSink>,
    queue_size: usize,
) -> (NotifierHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<String>(queue_size.max(1));
    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = sink.send(&message).await {
                tracing::warn!(sink = sink.name(), error = %e, "Notification delivery failed");
            }
        }
        tracing::debug!(sink = sink.name(), "Notification worker exiting");
    });
    (NotifierHandle::new(tx), handle)
}
