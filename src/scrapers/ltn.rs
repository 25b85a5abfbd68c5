//! LTN (自由時報) breaking-news scraper.
//!
//! Scrapes the breaking-news listing at
//! [news.ltn.com.tw/list/breakingnews](https://news.ltn.com.tw/list/breakingnews).
//! The listing pairs headline anchors with lazy-loaded thumbnails in two
//! parallel node lists, keeps the publication time either inside the anchor
//! text or in a neighboring `.time` node, and serves a noisier headline on
//! the listing than on the article page itself.
//!
//! Because of that last quirk this adapter performs a secondary fetch into
//! each article page and prefers its `<h1>` as the headline; any failure on
//! that second fetch silently falls back to the cleaned listing title.

use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::error::FeedError;
use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::normalize::{extract_clock_time, resolve_url};
use crate::scrapers::{
    RawCandidate, SourceAdapter, assemble_item, element_text, find_time_near,
    select_with_fallbacks,
};

const LISTING_URL: &str = "https://news.ltn.com.tw/list/breakingnews";

/// Headline anchors: the production layout first, then chains that survive
/// partial markup changes.
const TITLE_LOCATORS: &[&str] = &[".content940 a.tit", "a.tit", "ul.list li a", "div.list a"];

/// Thumbnail nodes, paired with the anchors by index.
const IMAGE_LOCATORS: &[&str] = &[
    ".content940 img.lazy_imgs_ltn",
    "img.lazy",
    "ul.list li img",
    "img",
];

/// Headline nodes tried on the article page, most specific first.
const ARTICLE_TITLE_LOCATORS: &[&str] = &[
    "h1.article-title",
    "h1#articleTitle",
    "h1.title",
    ".whitecon.boxTitle h1",
    "h1",
];

const TITLE_MAX: usize = 60;

pub struct LtnAdapter {
    fetcher: Arc<dyn PageFetcher>,
}

impl LtnAdapter {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

/// Lift candidates out of the listing page.
fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawCandidate>, FeedError> {
    let document = Html::parse_document(html);
    let anchors = select_with_fallbacks(&document, TITLE_LOCATORS);
    if anchors.is_empty() {
        return Err(FeedError::parse(LISTING_URL, html));
    }
    let images = select_with_fallbacks(&document, IMAGE_LOCATORS);

    let mut candidates = Vec::new();
    for (idx, anchor) in anchors.into_iter().take(limit).enumerate() {
        let raw_title = element_text(anchor);
        let time = extract_clock_time(&raw_title).or_else(|| find_time_near(anchor));
        let href = anchor.value().attr("href").unwrap_or_default().to_string();
        // Lazy-loaded thumbnails keep the real URL in data-src.
        let image = images.get(idx).and_then(|img| {
            img.value()
                .attr("data-src")
                .or_else(|| img.value().attr("src"))
                .map(str::to_string)
        });
        candidates.push(RawCandidate {
            raw_title,
            time,
            href,
            image,
        });
    }
    Ok(candidates)
}

/// Pull the authoritative headline out of an article page, if any.
fn parse_article_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let hits = select_with_fallbacks(&document, ARTICLE_TITLE_LOCATORS);
    hits.first()
        .map(|el| element_text(*el))
        .filter(|text| !text.is_empty())
}

#[async_trait]
impl SourceAdapter for LtnAdapter {
    fn name(&self) -> &'static str {
        "ltn"
    }

    async fn latest(&self, limit: usize) -> Result<Vec<NewsItem>, FeedError> {
        let body = self.fetcher.get(LISTING_URL).await?;
        let candidates = parse_listing(&body, limit)?;
        let base = Url::parse(LISTING_URL).unwrap();

        let mut items = Vec::new();
        for mut candidate in candidates {
            if let Some(article_url) = resolve_url(&candidate.href, &base) {
                match self.fetcher.get(&article_url).await {
                    Ok(article_html) => {
                        if let Some(headline) = parse_article_title(&article_html) {
                            candidate.raw_title = headline;
                        }
                    }
                    Err(e) => {
                        debug!(url = %article_url, error = %e, "article page unavailable; keeping listing title");
                    }
                }
            }
            if let Some(item) = assemble_item(candidate, &base, TITLE_MAX) {
                items.push(item);
            }
        }
        debug!(count = items.len(), "ltn items extracted");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    const LISTING: &str = r#"
        <div class="content940">
          <ul>
            <li>
              <a class="tit" href="/news/society/breakingnews/100">05:12 第一則快訊</a>
              <img class="lazy_imgs_ltn" data-src="//img.ltn.com.tw/100.jpg" src="/placeholder.gif">
            </li>
            <li>
              <a class="tit" href="/news/politics/breakingnews/101">第二則快訊</a>
              <span class="time">06:45</span>
              <img class="lazy_imgs_ltn" src="/101.jpg">
            </li>
            <li>
              <a class="tit" href="javascript:void(0)">壞掉的候選</a>
              <img class="lazy_imgs_ltn" src="/102.jpg">
            </li>
          </ul>
        </div>"#;

    const FALLBACK_LISTING: &str = r#"
        <ul class="list">
          <li><a href="/news/life/breakingnews/200">12:00 改版後的快訊</a></li>
        </ul>"#;

    #[test]
    fn test_parse_listing_primary_locators() {
        let candidates = parse_listing(LISTING, 5).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].time.as_deref(), Some("05:12"));
        assert_eq!(
            candidates[0].image.as_deref(),
            Some("//img.ltn.com.tw/100.jpg"),
            "data-src wins over the placeholder src"
        );
        assert_eq!(candidates[1].time.as_deref(), Some("06:45"));
    }

    #[test]
    fn test_parse_listing_respects_limit() {
        let candidates = parse_listing(LISTING, 2).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_parse_listing_backup_locators() {
        let candidates = parse_listing(FALLBACK_LISTING, 5).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].href, "/news/life/breakingnews/200");
    }

    #[test]
    fn test_parse_listing_unrecognizable_markup_is_parse_failure() {
        let err = parse_listing("<html><body><p>維修中</p></body></html>", 5).unwrap_err();
        assert!(matches!(err, FeedError::Parse { .. }));
    }

    #[test]
    fn test_parse_article_title_prefers_specific_h1() {
        let html = r#"<h1>generic</h1><h1 class="article-title">正式標題</h1>"#;
        assert_eq!(parse_article_title(html), Some("正式標題".to_string()));
    }

    #[test]
    fn test_parse_article_title_falls_back_to_first_h1() {
        let html = "<h1> 只有這個 </h1>";
        assert_eq!(parse_article_title(html), Some("只有這個".to_string()));
    }

    #[test]
    fn test_parse_article_title_absent() {
        assert_eq!(parse_article_title("<p>no heading</p>"), None);
    }

    #[tokio::test]
    async fn test_latest_uses_article_headline_when_reachable() {
        let fetcher = StaticFetcher::new()
            .with_page(LISTING_URL, LISTING)
            .with_page(
                "https://news.ltn.com.tw/news/society/breakingnews/100",
                r#"<h1 class="article-title">文章頁的完整標題</h1>"#,
            );
        let adapter = LtnAdapter::new(Arc::new(fetcher));

        let items = adapter.latest(1).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "文章頁的完整標題");
        assert_eq!(items[0].time.as_deref(), Some("05:12"));
        assert_eq!(items[0].image.as_deref(), Some("https://img.ltn.com.tw/100.jpg"));
    }

    #[tokio::test]
    async fn test_latest_falls_back_to_listing_title() {
        // No article pages registered: every secondary fetch fails.
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, LISTING);
        let adapter = LtnAdapter::new(Arc::new(fetcher));

        let items = adapter.latest(5).await.unwrap();
        // The javascript: candidate is dropped, the rest survive.
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "第一則快訊");
        assert_eq!(
            items[0].url,
            "https://news.ltn.com.tw/news/society/breakingnews/100"
        );
        assert_eq!(items[1].title, "第二則快訊");
    }

    #[tokio::test]
    async fn test_latest_listing_fetch_failure_propagates() {
        let adapter = LtnAdapter::new(Arc::new(StaticFetcher::new()));
        assert!(matches!(
            adapter.latest(3).await.unwrap_err(),
            FeedError::Fetch { .. }
        ));
    }
}
