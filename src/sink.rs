//! Delivery of normalized items to chat-channel destinations.
//!
//! The scheduler only knows the [`DispatchSink`] contract: deliver one
//! item to one destination handle, succeed or fail. The production
//! implementation posts webhook messages with a single embed per item —
//! time on the first line, headline on the second, thumbnail attached when
//! the item carries one.
//!
//! Failure classification matters more than the transport here: a
//! retriable failure leaves the item undelivered so the next cycle tries
//! again, while a thumbnail rejection tells the scheduler to strip the
//! image and resend exactly once.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::models::NewsItem;

/// Deliver one normalized item to a destination handle.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn deliver(&self, destination: &str, item: &NewsItem) -> Result<(), DispatchError>;
}

/// Webhook-posting sink. The destination handle is the webhook URL itself.
pub struct WebhookSink {
    client: Client,
}

impl WebhookSink {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

/// Build the webhook body for one item.
///
/// The embed title puts the clock time on its own first line so channel
/// readers can scan arrival times at a glance; items without a time just
/// show the headline.
pub(crate) fn embed_payload(item: &NewsItem) -> Value {
    let title = match &item.time {
        Some(time) => format!("{time}\n{}", item.title),
        None => item.title.clone(),
    };
    let mut embed = json!({
        "title": title,
        "url": item.url,
        "timestamp": Utc::now().to_rfc3339(),
    });
    if let Some(image) = &item.image {
        embed["thumbnail"] = json!({ "url": image });
    }
    json!({ "embeds": [embed] })
}

#[async_trait]
impl DispatchSink for WebhookSink {
    async fn deliver(&self, destination: &str, item: &NewsItem) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(destination)
            .json(&embed_payload(item))
            .send()
            .await
            .map_err(|e| DispatchError::Send {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(url = %item.url, "item delivered");
            return Ok(());
        }

        let message: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        // A 400 naming the thumbnail means the embed itself is fine and
        // only the image reference is unacceptable to the destination.
        if status.as_u16() == 400 && message.to_ascii_lowercase().contains("thumbnail") {
            warn!(url = %item.url, "destination rejected thumbnail");
            return Err(DispatchError::RejectedThumbnail);
        }
        Err(DispatchError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(time: Option<&str>, image: Option<&str>) -> NewsItem {
        NewsItem {
            time: time.map(str::to_string),
            title: "頭條新聞".to_string(),
            url: "https://news.example.com/a/1".to_string(),
            image: image.map(str::to_string),
        }
    }

    #[test]
    fn test_embed_payload_time_on_first_line() {
        let payload = embed_payload(&item(Some("08:15"), None));
        assert_eq!(payload["embeds"][0]["title"], "08:15\n頭條新聞");
        assert_eq!(payload["embeds"][0]["url"], "https://news.example.com/a/1");
    }

    #[test]
    fn test_embed_payload_without_time() {
        let payload = embed_payload(&item(None, None));
        assert_eq!(payload["embeds"][0]["title"], "頭條新聞");
    }

    #[test]
    fn test_embed_payload_thumbnail_present_only_when_image_set() {
        let with_image = embed_payload(&item(None, Some("https://img.example.com/1.jpg")));
        assert_eq!(
            with_image["embeds"][0]["thumbnail"]["url"],
            "https://img.example.com/1.jpg"
        );

        let without_image = embed_payload(&item(None, None));
        assert!(without_image["embeds"][0].get("thumbnail").is_none());
    }

    #[test]
    fn test_embed_payload_single_embed_with_timestamp() {
        let payload = embed_payload(&item(Some("23:59"), Some("https://img.example.com/2.jpg")));
        assert_eq!(payload["embeds"].as_array().unwrap().len(), 1);
        assert!(payload["embeds"][0]["timestamp"].is_string());
    }
}
