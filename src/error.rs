use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected message (status {status}): {body}")]
    Status { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("no symbols to subscribe")]
    NoSubscriptions,

    #[error("feed is not subscribed")]
    NotSubscribed,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("batch consumer closed")]
    ConsumerClosed,
}

#[derive(Error, Debug)]
pub enum SymbolFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing 'symbol'")]
    MissingSymbol,

    #[error("invalid {field}: {value}")]
    InvalidThreshold { field: &'static str, value: f64 },
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("local echo failed: {0}")]
    Echo(#[from] std::io::Error),
}
