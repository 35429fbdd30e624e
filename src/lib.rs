pub mod alert_gate;
pub mod binance {
    pub mod types;
    pub mod ws;
}
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod model {
    pub mod profile;
    pub mod tick;
}
pub mod notifier;
pub mod symbols;
pub mod watcher;
