//! Injected page-fetch capability.
//!
//! Adapters never talk to the network directly; they receive a
//! [`PageFetcher`] and ask it for page bodies. This keeps every parser
//! unit-testable against fixture HTML and concentrates transport policy —
//! the pinned browser `User-Agent`, the bounded timeout, status handling —
//! in one place.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FeedError;

/// Browser user agent sent with every listing and article request. Several
/// of the watched sites answer bot user agents with interstitial pages.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

/// Capability to fetch one page body over HTTP.
///
/// The single method either yields the body of a successful response or a
/// recoverable [`FeedError`]; no call blocks past the configured timeout.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the response body.
    async fn get(&self, url: &str) -> Result<String, FeedError>;
}

/// Production fetcher backed by a shared [`reqwest::Client`].
///
/// The client is cheap to clone and safe for concurrent use, so one
/// `HttpFetcher` is shared by every adapter across every feed.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the pinned user agent and a bounded timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String, FeedError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            FeedError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| FeedError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!(%url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}
