//! ETtoday realtime-hot scraper.
//!
//! Scrapes [www.ettoday.net/news/realtime-hot.htm](https://www.ettoday.net/news/realtime-hot.htm).
//! Candidates are the `h3` headline blocks inside `div.part_list_2`; the
//! time sits in a `span.date` inside the block, but the thumbnail lives in
//! a *preceding sibling* `<a>` — the layout keeps images outside the
//! headline markup, so this adapter walks backwards to find one.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::error::FeedError;
use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::normalize::extract_clock_time;
use crate::scrapers::{
    RawCandidate, SourceAdapter, assemble_item, element_text, select_with_fallbacks,
};

const LISTING_URL: &str = "https://www.ettoday.net/news/realtime-hot.htm";

const CANDIDATE_LOCATORS: &[&str] = &["div.part_list_2 h3", "div.part_list_1 h3"];

const TITLE_MAX: usize = 60;

pub struct EttodayAdapter {
    fetcher: Arc<dyn PageFetcher>,
}

impl EttodayAdapter {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

/// Thumbnail from the nearest preceding sibling `<a>` that wraps an image.
fn sibling_image(block: ElementRef<'_>) -> Option<String> {
    let image_selector = Selector::parse("img").unwrap();
    block
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
        .and_then(|a| a.select(&image_selector).next())
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string)
}

fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawCandidate>, FeedError> {
    let document = Html::parse_document(html);
    let blocks = select_with_fallbacks(&document, CANDIDATE_LOCATORS);
    if blocks.is_empty() {
        return Err(FeedError::parse(LISTING_URL, html));
    }

    let anchor_selector = Selector::parse("a").unwrap();
    let date_selector = Selector::parse("span.date").unwrap();

    let mut candidates = Vec::new();
    for block in blocks.into_iter().take(limit) {
        let Some(anchor) = block.select(&anchor_selector).next() else {
            continue;
        };
        let raw_title = element_text(anchor);
        let time = extract_clock_time(&raw_title).or_else(|| {
            block
                .select(&date_selector)
                .next()
                .and_then(|el| extract_clock_time(&element_text(el)))
        });
        candidates.push(RawCandidate {
            raw_title,
            time,
            href: anchor.value().attr("href").unwrap_or_default().to_string(),
            image: sibling_image(block),
        });
    }
    Ok(candidates)
}

#[async_trait]
impl SourceAdapter for EttodayAdapter {
    fn name(&self) -> &'static str {
        "ettoday"
    }

    async fn latest(&self, limit: usize) -> Result<Vec<NewsItem>, FeedError> {
        let body = self.fetcher.get(LISTING_URL).await?;
        let candidates = parse_listing(&body, limit)?;
        let base = Url::parse(LISTING_URL).unwrap();
        let items: Vec<NewsItem> = candidates
            .into_iter()
            .filter_map(|candidate| assemble_item(candidate, &base, TITLE_MAX))
            .collect();
        debug!(count = items.len(), "ettoday items extracted");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    const LISTING: &str = r#"
        <div class="part_list_2">
          <a href="/news/4001"><img src="/images/4001.jpg"></a>
          <h3>
            <span class="date">2025/08/06 11:05</span>
            <a href="/news/4001">熱門新聞第一則</a>
          </h3>
        </div>
        <div class="part_list_2">
          <h3>
            <a href="/news/4002">熱門新聞第二則</a>
          </h3>
        </div>"#;

    #[test]
    fn test_parse_listing_extracts_fields() {
        let candidates = parse_listing(LISTING, 5).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].raw_title, "熱門新聞第一則");
        assert_eq!(candidates[0].time.as_deref(), Some("11:05"));
        assert_eq!(candidates[0].image.as_deref(), Some("/images/4001.jpg"));
        assert_eq!(candidates[1].image, None, "no preceding sibling image");
        assert_eq!(candidates[1].time, None);
    }

    #[test]
    fn test_parse_listing_backup_locators() {
        let html = r#"<div class="part_list_1"><h3><a href="/news/5000">備援版面</a></h3></div>"#;
        let candidates = parse_listing(html, 5).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].raw_title, "備援版面");
    }

    #[test]
    fn test_parse_listing_empty_page_is_parse_failure() {
        assert!(matches!(
            parse_listing("<p>沒有清單</p>", 3).unwrap_err(),
            FeedError::Parse { .. }
        ));
    }

    #[tokio::test]
    async fn test_latest_resolves_urls_against_site_root() {
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, LISTING);
        let adapter = EttodayAdapter::new(Arc::new(fetcher));

        let items = adapter.latest(5).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://www.ettoday.net/news/4001");
        assert_eq!(
            items[0].image.as_deref(),
            Some("https://www.ettoday.net/images/4001.jpg")
        );
    }
}
