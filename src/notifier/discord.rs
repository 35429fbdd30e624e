use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::NotificationSink;
use crate::error::NotifyError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

/// Posts plain-text content to a Discord-compatible webhook.
pub struct DiscordWebhookSink {
    http: reqwest::Client,
    webhook_url: String,
    username: Option<String>,
}

impl DiscordWebhookSink {
    pub fn new(webhook_url: &str, username: Option<&str>) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            webhook_url: webhook_url.to_string(),
            username: username
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
        })
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            content: message,
            username: self.username.as_deref(),
        };
        let resp = self.http.post(&self.webhook_url).json(&payload).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_omits_missing_username() {
        let json = serde_json::to_string(&WebhookPayload {
            content: "hi",
            username: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"content":"hi"}"#);

        let json = serde_json::to_string(&WebhookPayload {
            content: "hi",
            username: Some("Price Watcher"),
        })
        .unwrap();
        assert_eq!(json, r#"{"content":"hi","username":"Price Watcher"}"#);
    }

    #[test]
    fn blank_username_is_dropped() {
        let sink = DiscordWebhookSink::new("https://example.invalid/hook", Some("  ")).unwrap();
        assert!(sink.username.is_none());
    }
}
