//! Error taxonomy for fetching, parsing, and dispatching.
//!
//! Two families of failure exist in this application and they are kept as
//! separate enums because their callers react differently:
//!
//! - [`FeedError`]: a source could not be fetched or its expected structure
//!   was absent. Always recoverable — the scheduler logs it, skips the
//!   source, and retries on the next cycle.
//! - [`DispatchError`]: the destination rejected a delivery. Retriable
//!   failures leave the item unmarked so it is retried next cycle;
//!   a thumbnail rejection is handled by resending once without the image.
//!
//! Individual malformed candidates (bad URL, empty title) are not errors at
//! all — adapters drop them with a warning and keep going.

use thiserror::Error;

/// Failure while fetching or parsing a source.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure: connect error, timeout, body read error.
    #[error("request for {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// None of the primary or backup locators matched anything. Carries a
    /// snippet of the received body for diagnosis of markup drift.
    #[error("no recognizable item list at {url}; body starts: {snippet}")]
    Parse { url: String, snippet: String },
}

impl FeedError {
    /// Build a [`FeedError::Parse`] with a bounded snippet of the body.
    pub fn parse(url: &str, body: &str) -> Self {
        let snippet: String = body.chars().take(200).collect();
        FeedError::Parse {
            url: url.to_string(),
            snippet: snippet.replace('\n', " "),
        }
    }
}

/// Failure while delivering one item to a destination.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Transport-level failure talking to the destination.
    #[error("delivery failed: {reason}")]
    Send { reason: String },

    /// The destination answered with a non-success status.
    #[error("destination answered {status}: {message}")]
    Status { status: u16, message: String },

    /// The destination rejected the item's thumbnail specifically. The
    /// caller strips the image and resends exactly once.
    #[error("destination rejected the thumbnail")]
    RejectedThumbnail,
}

impl DispatchError {
    /// Whether the failure should be handled by stripping the thumbnail and
    /// resending once, rather than retrying the item next cycle.
    pub fn is_thumbnail_rejection(&self) -> bool {
        matches!(self, DispatchError::RejectedThumbnail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_snippet_is_bounded() {
        let body = "x".repeat(5000);
        let err = FeedError::parse("https://example.com", &body);
        match err {
            FeedError::Parse { snippet, .. } => assert_eq!(snippet.chars().count(), 200),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_snippet_flattens_newlines() {
        let err = FeedError::parse("https://example.com", "line one\nline two");
        match err {
            FeedError::Parse { snippet, .. } => assert!(!snippet.contains('\n')),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_thumbnail_rejection_classification() {
        assert!(DispatchError::RejectedThumbnail.is_thumbnail_rejection());
        assert!(
            !DispatchError::Send {
                reason: "timeout".into()
            }
            .is_thumbnail_rejection()
        );
        assert!(
            !DispatchError::Status {
                status: 500,
                message: "oops".into()
            }
            .is_thumbnail_rejection()
        );
    }
}
