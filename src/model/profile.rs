use serde::Deserialize;

fn default_exchange() -> String {
    "SMART".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_sec_type() -> String {
    "STK".to_string()
}

/// Static per-symbol configuration, one JSON file per symbol on disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SymbolProfile {
    /// Upper-cased instrument identifier.
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub nickname: Option<String>,
    /// Override of the global absolute-change threshold.
    #[serde(default)]
    pub min_change_abs: Option<f64>,
    /// Override of the global percent-change threshold.
    #[serde(default)]
    pub min_change_pct: Option<f64>,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_sec_type", alias = "secType")]
    pub sec_type: String,
}

impl SymbolProfile {
    /// Profile with no overrides and default routing.
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.trim().to_ascii_uppercase(),
            nickname: None,
            min_change_abs: None,
            min_change_pct: None,
            exchange: default_exchange(),
            currency: default_currency(),
            sec_type: default_sec_type(),
        }
    }

    pub fn with_nickname(mut self, nickname: &str) -> Self {
        self.nickname = Some(nickname.to_string());
        self
    }

    pub fn with_thresholds(mut self, min_change_abs: Option<f64>, min_change_pct: Option<f64>) -> Self {
        self.min_change_abs = min_change_abs;
        self.min_change_pct = min_change_pct;
        self
    }

    /// `"Nickname (SYM)"` when a non-blank nickname is set, else the bare symbol.
    pub fn display_label(&self) -> String {
        match self.nickname.as_deref().map(str::trim) {
            Some(nick) if !nick.is_empty() => format!("{} ({})", nick, self.symbol),
            _ => self.symbol.clone(),
        }
    }
}
