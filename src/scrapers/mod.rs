//! Source adapters for the watched listing pages.
//!
//! Each submodule maps one external site's markup onto the shared
//! [`NewsItem`] record. The sites share nothing — selector sets and URL
//! layouts differ arbitrarily — so only the *algorithm shape* is common:
//!
//! 1. Locate candidates with a primary locator, falling through an ordered
//!    chain of backups when the markup has drifted
//! 2. Recover the clock time from the headline text, else from nearby nodes
//! 3. Resolve link and thumbnail URLs to absolute `http(s)` form
//! 4. Clean the headline (strip clock tokens, collapse, truncate)
//! 5. Drop candidates that fail URL resolution instead of aborting the batch
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | LTN 即時新聞 | [`ltn`] | HTML scraping | Secondary fetch recovers the article `<h1>` |
//! | TVBS 新聞 | [`tvbs`] | HTML scraping | Realtime list, time in a sibling node |
//! | ETtoday 新聞雲 | [`ettoday`] | HTML scraping | Thumbnails live outside the headline block |
//! | Reddit r/Games | [`reddit`] | HTML attributes | Custom elements carry the data as attributes |
//!
//! Adapters never touch the network directly; they go through the injected
//! [`PageFetcher`] so every parser is testable on fixture HTML.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::warn;
use url::Url;

use crate::error::FeedError;
use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::normalize::{extract_clock_time, resolve_url, shorten, strip_clock_tokens};

pub mod ettoday;
pub mod ltn;
pub mod reddit;
pub mod tvbs;

/// One external site translated into normalized items.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short identifier used in logs and feed configuration.
    fn name(&self) -> &'static str;

    /// Fetch up to `limit` items in the site's rendered order, newest
    /// first. Transport and structure failures surface as [`FeedError`];
    /// individual malformed candidates are dropped silently.
    async fn latest(&self, limit: usize) -> Result<Vec<NewsItem>, FeedError>;
}

/// The configured set of sources, resolved to adapter instances at
/// configuration time rather than looked up by string at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    Ltn,
    Tvbs,
    Ettoday,
    RedditGames,
}

impl SourceId {
    /// Instantiate the adapter for this source over the given fetcher.
    pub fn build(self, fetcher: Arc<dyn PageFetcher>) -> Box<dyn SourceAdapter> {
        match self {
            SourceId::Ltn => Box::new(ltn::LtnAdapter::new(fetcher)),
            SourceId::Tvbs => Box::new(tvbs::TvbsAdapter::new(fetcher)),
            SourceId::Ettoday => Box::new(ettoday::EttodayAdapter::new(fetcher)),
            SourceId::RedditGames => Box::new(reddit::RedditGamesAdapter::new(fetcher)),
        }
    }
}

/// A candidate as lifted from the listing markup, before normalization.
#[derive(Debug)]
pub(crate) struct RawCandidate {
    pub raw_title: String,
    pub time: Option<String>,
    pub href: String,
    pub image: Option<String>,
}

/// Node selectors that commonly carry a publication time near a headline.
const TIME_LOCATORS: &[&str] = &[".time", "time", ".date", "em.time", "span.time"];

/// Run a locator chain against the document: the first selector that
/// yields any element wins, later selectors are only consulted when
/// earlier ones come up empty. Appending a new fallback never disturbs
/// the existing ones.
pub(crate) fn select_with_fallbacks<'a>(
    document: &'a Html,
    chain: &[&str],
) -> Vec<ElementRef<'a>> {
    for css in chain {
        let selector = Selector::parse(css).unwrap();
        let hits: Vec<ElementRef<'a>> = document.select(&selector).collect();
        if !hits.is_empty() {
            return hits;
        }
    }
    Vec::new()
}

/// Whole text of an element with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    crate::normalize::collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Search the headline's surroundings for a clock time.
///
/// Some layouts keep the time out of the anchor text entirely and park it
/// in a `.time`/`<time>` node beside or above it. Looks at the element
/// itself, its parent, and its grandparent; within each scope the known
/// time nodes are tried first, then the scope's own text.
pub(crate) fn find_time_near(anchor: ElementRef<'_>) -> Option<String> {
    let mut scopes = vec![anchor];
    let mut node = anchor.parent();
    for _ in 0..2 {
        let Some(n) = node else { break };
        if let Some(el) = ElementRef::wrap(n) {
            scopes.push(el);
        }
        node = n.parent();
    }

    for scope in scopes {
        for css in TIME_LOCATORS {
            let selector = Selector::parse(css).unwrap();
            if let Some(el) = scope.select(&selector).next() {
                if let Some(time) = extract_clock_time(&element_text(el)) {
                    return Some(time);
                }
            }
        }
        if let Some(time) = extract_clock_time(&element_text(scope)) {
            return Some(time);
        }
    }
    None
}

/// Turn a raw candidate into a [`NewsItem`], or drop it.
///
/// Link resolution failure drops the candidate (logged, batch continues);
/// thumbnail resolution failure only drops the thumbnail. The headline is
/// stripped of clock tokens, collapsed, and truncated to `title_max`.
pub(crate) fn assemble_item(
    candidate: RawCandidate,
    base: &Url,
    title_max: usize,
) -> Option<NewsItem> {
    let Some(url) = resolve_url(&candidate.href, base) else {
        warn!(href = %candidate.href, "dropping candidate with unresolvable link");
        return None;
    };
    let image = candidate
        .image
        .as_deref()
        .and_then(|raw| resolve_url(raw, base));
    let title = shorten(&strip_clock_tokens(&candidate.raw_title), title_max);
    NewsItem::new(candidate.time, title, url, image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_anchor(html: &Html) -> ElementRef<'_> {
        let selector = Selector::parse("a").unwrap();
        html.select(&selector).next().unwrap()
    }

    #[test]
    fn test_select_with_fallbacks_prefers_primary() {
        let html = Html::parse_document(
            r#"<div class="main"><a class="tit" href="/a">A</a></div><a href="/b">B</a>"#,
        );
        let hits = select_with_fallbacks(&html, &[".main a.tit", "a"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value().attr("href"), Some("/a"));
    }

    #[test]
    fn test_select_with_fallbacks_falls_through() {
        let html = Html::parse_document(r#"<ul class="list"><li><a href="/x">X</a></li></ul>"#);
        let hits = select_with_fallbacks(&html, &[".main a.tit", "ul.list li a"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value().attr("href"), Some("/x"));
    }

    #[test]
    fn test_select_with_fallbacks_exhausted() {
        let html = Html::parse_document("<p>nothing here</p>");
        assert!(select_with_fallbacks(&html, &[".main a", "ul li a"]).is_empty());
    }

    #[test]
    fn test_find_time_near_sibling_time_node() {
        let html = Html::parse_document(
            r#"<li><a href="/a">headline</a><span class="time">14:07</span></li>"#,
        );
        assert_eq!(find_time_near(first_anchor(&html)), Some("14:07".to_string()));
    }

    #[test]
    fn test_find_time_near_grandparent_scope() {
        let html = Html::parse_document(
            r#"<div><em class="time">昨天 9:03</em><p><a href="/a">headline</a></p></div>"#,
        );
        assert_eq!(find_time_near(first_anchor(&html)), Some("09:03".to_string()));
    }

    #[test]
    fn test_find_time_near_container_text_fallback() {
        let html =
            Html::parse_document(r#"<li><a href="/a">headline</a> 發布 18:40</li>"#);
        assert_eq!(find_time_near(first_anchor(&html)), Some("18:40".to_string()));
    }

    #[test]
    fn test_find_time_near_absent() {
        let html = Html::parse_document(r#"<li><a href="/a">headline only</a></li>"#);
        assert_eq!(find_time_near(first_anchor(&html)), None);
    }

    #[test]
    fn test_assemble_item_happy_path() {
        let base = Url::parse("https://site.example.com/list").unwrap();
        let item = assemble_item(
            RawCandidate {
                raw_title: "09:30 頭條  新聞".to_string(),
                time: Some("09:30".to_string()),
                href: "/article/1".to_string(),
                image: Some("//img.example.com/t.jpg".to_string()),
            },
            &base,
            60,
        )
        .unwrap();
        assert_eq!(item.title, "頭條 新聞");
        assert_eq!(item.url, "https://site.example.com/article/1");
        assert_eq!(item.image.as_deref(), Some("https://img.example.com/t.jpg"));
        assert_eq!(item.time.as_deref(), Some("09:30"));
    }

    #[test]
    fn test_assemble_item_drops_bad_link() {
        let base = Url::parse("https://site.example.com/").unwrap();
        let dropped = assemble_item(
            RawCandidate {
                raw_title: "title".to_string(),
                time: None,
                href: "javascript:void(0)".to_string(),
                image: None,
            },
            &base,
            60,
        );
        assert!(dropped.is_none());
    }

    #[test]
    fn test_assemble_item_bad_image_kept_without_thumbnail() {
        let base = Url::parse("https://site.example.com/").unwrap();
        let item = assemble_item(
            RawCandidate {
                raw_title: "title".to_string(),
                time: None,
                href: "/a".to_string(),
                image: Some("data:image/png;base64,xxxx".to_string()),
            },
            &base,
            60,
        )
        .unwrap();
        assert!(item.image.is_none());
    }

    #[test]
    fn test_assemble_item_title_reduced_to_empty_is_dropped() {
        let base = Url::parse("https://site.example.com/").unwrap();
        let dropped = assemble_item(
            RawCandidate {
                raw_title: "10:00 - 11:30".to_string(),
                time: Some("10:00".to_string()),
                href: "/a".to_string(),
                image: None,
            },
            &base,
            60,
        );
        assert!(dropped.is_none());
    }
}
