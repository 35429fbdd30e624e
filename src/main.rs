use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use price_watcher::binance::ws::BinanceTickerFeed;
use price_watcher::config::Config;
use price_watcher::notifier::{DiscordWebhookSink, NotificationSink};
use price_watcher::symbols::load_symbols;
use price_watcher::watcher::{forward_shutdown, Watcher};

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    // Logs go to stderr; stdout carries the alert echo.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .logging
            .level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::info!(
        throttle_seconds = config.throttle_seconds,
        min_change_abs = config.defaults.min_change_abs,
        min_change_pct = config.defaults.min_change_pct,
        symbols_dir = %config.paths.symbols_dir.display(),
        "Starting price-watcher"
    );

    let registry = load_symbols(&config.paths.symbols_dir)?;

    let mut watcher = Watcher::new(registry, config.gate_config())
        .with_queues(config.feed.batch_queue, config.discord.queue_size);
    match config.discord.webhook() {
        Some(url) => {
            let sink = DiscordWebhookSink::new(url, Some(&config.discord.username))
                .context("failed to build webhook client")?;
            watcher = watcher.with_sink(Arc::new(sink) as Arc<dyn NotificationSink>);
        }
        None => {
            tracing::warn!("No Discord webhook configured; messages will only print to console");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(forward_shutdown(tokio::signal::ctrl_c(), shutdown_tx));

    let feed = BinanceTickerFeed::new(&config.feed.ws_base_url);
    watcher.run(feed, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
