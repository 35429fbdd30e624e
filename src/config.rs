use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::alert_gate::{GateConfig, Thresholds};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum seconds between two alerts for the same symbol. `<= 0` disables.
    pub throttle_seconds: f64,
    pub defaults: DefaultsConfig,
    pub discord: DiscordConfig,
    pub paths: PathsConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub min_change_abs: f64,
    pub min_change_pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Empty disables webhook delivery.
    pub webhook_url: String,
    pub username: String,
    pub queue_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub symbols_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub ws_base_url: String,
    pub batch_queue: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            throttle_seconds: 2.0,
            defaults: DefaultsConfig::default(),
            discord: DiscordConfig::default(),
            paths: PathsConfig::default(),
            feed: FeedConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            username: "Price Watcher".to_string(),
            queue_size: 64,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            symbols_dir: PathBuf::from("symbols"),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "wss://stream.binance.com:9443".to_string(),
            batch_queue: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl DiscordConfig {
    /// Webhook URL if delivery is configured.
    pub fn webhook(&self) -> Option<&str> {
        let url = self.webhook_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

fn config_path() -> PathBuf {
    std::env::var("PRICE_WATCHER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn parse_f64_var(name: &str, raw: Option<String>) -> Result<Option<f64>> {
    match raw {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("{} is not a number: '{}'", name, raw))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

impl Config {
    /// Load `.env`, the TOML file, then environment overrides, and validate.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::from_path(&config_path())?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. A missing file yields the built-in defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&config_str).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by environment variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = parse_f64_var("THROTTLE_SECONDS", lookup("THROTTLE_SECONDS"))? {
            self.throttle_seconds = v;
        }
        if let Some(v) = parse_f64_var("DEFAULT_MIN_CHANGE_ABS", lookup("DEFAULT_MIN_CHANGE_ABS"))? {
            self.defaults.min_change_abs = v;
        }
        if let Some(v) = parse_f64_var("DEFAULT_MIN_CHANGE_PCT", lookup("DEFAULT_MIN_CHANGE_PCT"))? {
            self.defaults.min_change_pct = v;
        }
        if let Some(v) = lookup("DISCORD_WEBHOOK_URL") {
            self.discord.webhook_url = v;
        }
        if let Some(v) = lookup("SYMBOLS_DIR") {
            self.paths.symbols_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FEED_WS_URL") {
            self.feed.ws_base_url = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        check_non_negative("throttle_seconds", self.throttle_seconds)?;
        check_non_negative("defaults.min_change_abs", self.defaults.min_change_abs)?;
        check_non_negative("defaults.min_change_pct", self.defaults.min_change_pct)?;

        if let Some(url) = self.discord.webhook() {
            let parsed = url::Url::parse(url).context("discord.webhook_url is not a valid URL")?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("discord.webhook_url must be http(s), got '{}'", parsed.scheme());
            }
        }
        if self.feed.ws_base_url.trim().is_empty() {
            bail!("feed.ws_base_url is empty");
        }
        Ok(())
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig::new(
            self.throttle_seconds,
            Thresholds::new(self.defaults.min_change_abs, self.defaults.min_change_pct),
        )
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{} must be a finite number >= 0, got {}", field, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!((config.throttle_seconds - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.defaults.min_change_abs, 0.0);
        assert_eq!(config.paths.symbols_dir, PathBuf::from("symbols"));
        assert!(config.discord.webhook().is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn check_non_negative_rejects_nan_and_negative() {
        assert!(check_non_negative("x", 0.0).is_ok());
        assert!(check_non_negative("x", -0.1).is_err());
        assert!(check_non_negative("x", f64::NAN).is_err());
        assert!(check_non_negative("x", f64::INFINITY).is_err());
    }
}
