//! Core data model for normalized news items.
//!
//! Every source adapter, whatever the markup it scrapes, produces the same
//! record: a [`NewsItem`]. The scheduler and the dispatch sink only ever
//! see this shape, so a new source can be added without touching either.
//!
//! # Invariants
//!
//! - `title` is non-empty, whitespace-collapsed, and display-truncated.
//! - `url` is an absolute `http`/`https` URL. A candidate whose link fails
//!   resolution is dropped by its adapter — a `NewsItem` with a malformed
//!   URL is never constructed.
//! - `time` and `image` are optional; absence is normal, not an error.

use serde::Serialize;

/// A normalized "latest item" ready for deduplication and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    /// Local publication time as `HH:MM`, when the source exposed one.
    pub time: Option<String>,
    /// Cleaned, display-bounded headline.
    pub title: String,
    /// Absolute article URL.
    pub url: String,
    /// Absolute thumbnail URL, when the source provided one.
    pub image: Option<String>,
}

impl NewsItem {
    /// Construct an item, enforcing the non-empty-title invariant.
    ///
    /// URL validity is enforced upstream by
    /// [`resolve_url`](crate::normalize::resolve_url); this constructor
    /// guards the remaining invariant so adapters cannot hand the
    /// scheduler a blank headline.
    ///
    /// # Returns
    ///
    /// `None` when the cleaned title is empty — the caller drops the
    /// candidate and moves on.
    pub fn new(
        time: Option<String>,
        title: String,
        url: String,
        image: Option<String>,
    ) -> Option<Self> {
        if title.is_empty() {
            return None;
        }
        Some(Self {
            time,
            title,
            url,
            image,
        })
    }

    /// Derive the delivery key that identifies this notification.
    ///
    /// Two items are "the same notification" iff their keys match. The key
    /// deliberately ignores `time` and `image`: a thumbnail swap or a
    /// re-stamped time must not re-trigger delivery.
    pub fn delivery_key(&self) -> String {
        format!("{}-{}", self.title, self.url)
    }

    /// A copy of this item with the thumbnail removed, for resending after
    /// the destination rejects the image.
    pub fn without_image(&self) -> Self {
        Self {
            image: None,
            ..self.clone()
        }
    }
}
