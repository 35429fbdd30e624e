use serde::Deserialize;

use crate::model::tick::FeedTick;

/// Deserialize a Binance string-or-number price; missing, null or unparsable
/// values become `None`.
pub fn opt_string_or_number_to_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    })
}

/// Binance 24hr ticker event (`<symbol>@ticker`).
#[derive(Debug, Deserialize)]
pub struct BinanceTickerEvent {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub last_price: Option<f64>,
    #[serde(rename = "b", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub best_bid: Option<f64>,
    #[serde(rename = "a", default, deserialize_with = "opt_string_or_number_to_f64")]
    pub best_ask: Option<f64>,
}

impl BinanceTickerEvent {
    /// Bid/ask midpoint when both sides are quoted.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) if bid > 0.0 && ask > 0.0 && bid.is_finite() && ask.is_finite() => {
                Some((bid + ask) / 2.0)
            }
            _ => None,
        }
    }

    pub fn into_tick(self) -> FeedTick {
        let market_price = self.mid_price();
        FeedTick::new(&self.symbol, self.last_price, market_price)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TickerPayload {
    Many(Vec<BinanceTickerEvent>),
    One(BinanceTickerEvent),
}

/// A frame from either the combined (`/stream?streams=`) or raw (`/ws/`) endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TickerFrame {
    Combined { stream: String, data: TickerPayload },
    Raw(TickerPayload),
}

/// Parse one text frame into the batch of ticks it carries.
pub fn parse_ticker_frame(text: &str) -> Result<Vec<FeedTick>, serde_json::Error> {
    let frame: TickerFrame = serde_json::from_str(text)?;
    let payload = match frame {
        TickerFrame::Combined { data, .. } => data,
        TickerFrame::Raw(payload) => payload,
    };
    Ok(match payload {
        TickerPayload::Many(events) => events.into_iter().map(BinanceTickerEvent::into_tick).collect(),
        TickerPayload::One(event) => vec![event.into_tick()],
    })
}
