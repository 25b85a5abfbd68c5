//! TVBS realtime-news scraper.
//!
//! Scrapes [news.tvbs.com.tw/realtime](https://news.tvbs.com.tw/realtime).
//! Candidates are `li.news_list` blocks; the headline anchor sits under an
//! `h2`, the publication time in a `.time` node inside the block, and the
//! thumbnail is the block's first `img`.

use async_trait::async_trait;
use scraper::{Html, Selector};
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

const LISTING_URL: &str = "https://news.tvbs.com.tw/realtime";

const CANDIDATE_LOCATORS: &[&str] = &["li.news_list", "div.news_list li"];

const TIME_LOCATORS: &[&str] = &[".time", "div.time"];

const TITLE_MAX: usize = 60;

pub struct TvbsAdapter {
    fetcher: Arc<dyn PageFetcher>,
}

impl TvbsAdapter {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawCandidate>, FeedError> {
    let document = Html::parse_document(html);
    let blocks = select_with_fallbacks(&document, CANDIDATE_LOCATORS);
    if blocks.is_empty() {
        return Err(FeedError::parse(LISTING_URL, html));
    }

    let anchor_selector = Selector::parse("h2 a").unwrap();
    let image_selector = Selector::parse("img").unwrap();

    let mut candidates = Vec::new();
    for block in blocks.into_iter().take(limit) {
        let Some(anchor) = block.select(&anchor_selector).next() else {
            continue;
        };
        let raw_title = element_text(anchor);
        let time = extract_clock_time(&raw_title).or_else(|| {
            TIME_LOCATORS.iter().find_map(|css| {
                let selector = Selector::parse(css).unwrap();
                block
                    .select(&selector)
                    .next()
                    .and_then(|el| extract_clock_time(&element_text(el)))
            })
        });
        let image = block
            .select(&image_selector)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);
        candidates.push(RawCandidate {
            raw_title,
            time,
            href: anchor.value().attr("href").unwrap_or_default().to_string(),
            image,
        });
    }
    Ok(candidates)
}

#[async_trait]
impl SourceAdapter for TvbsAdapter {
    fn name(&self) -> &'static str {
        "tvbs"
    }

    async fn latest(&self, limit: usize) -> Result<Vec<NewsItem>, FeedError> {
        let body = self.fetcher.get(LISTING_URL).await?;
        let candidates = parse_listing(&body, limit)?;
        let base = Url::parse(LISTING_URL).unwrap();
        let items: Vec<NewsItem> = candidates
            .into_iter()
            .filter_map(|candidate| assemble_item(candidate, &base, TITLE_MAX))
            .collect();
        debug!(count = items.len(), "tvbs items extracted");
        Ok(items)
    }
}
