//! Reddit r/Games scraper for the gaming feed.
//!
//! Reddit's rendered frontend uses `shreddit-post` custom elements that
//! carry all the interesting data as attributes, so extraction here reads
//! attributes instead of text nodes. Posts carry no usable clock time.

use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::error::FeedError;
use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::scrapers::{RawCandidate, SourceAdapter, assemble_item, select_with_fallbacks};

const LISTING_URL: &str = "https://www.reddit.com/r/Games/";

const CANDIDATE_LOCATORS: &[&str] = &["shreddit-post", "article shreddit-post"];

/// Post titles run much longer than news headlines; give them more room.
const TITLE_MAX: usize = 120;

pub struct RedditGamesAdapter {
    fetcher: Arc<dyn PageFetcher>,
}

impl RedditGamesAdapter {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawCandidate>, FeedError> {
    let document = Html::parse_document(html);
    let posts = select_with_fallbacks(&document, CANDIDATE_LOCATORS);
    if posts.is_empty() {
        return Err(FeedError::parse(LISTING_URL, html));
    }

    let mut candidates = Vec::new();
    for post in posts.into_iter().take(limit) {
        let attrs = post.value();
        let Some(title) = attrs
            .attr("post-title")
            .or_else(|| attrs.attr("data-adclicktitle"))
        else {
            continue;
        };
        let Some(href) = attrs
            .attr("content-href")
            .or_else(|| attrs.attr("permalink"))
        else {
            continue;
        };
        candidates.push(RawCandidate {
            raw_title: title.to_string(),
            time: None,
            href: href.to_string(),
            image: attrs.attr("thumbnail-url").map(str::to_string),
        });
    }
    Ok(candidates)
}

#[async_trait]
impl SourceAdapter for RedditGamesAdapter {
    fn name(&self) -> &'static str {
        "reddit-games"
    }

    async fn latest(&self, limit: usize) -> Result<Vec<NewsItem>, FeedError> {
        let body = self.fetcher.get(LISTING_URL).await?;
        let candidates = parse_listing(&body, limit)?;
        let base = Url::parse(LISTING_URL).unwrap();
        let items: Vec<NewsItem> = candidates
            .into_iter()
            .filter_map(|candidate| assemble_item(candidate, &base, TITLE_MAX))
            .collect();
        debug!(count = items.len(), "reddit items extracted");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    const LISTING: &str = r#"
        <shreddit-post
            post-title="New RPG announced at last"
            content-href="https://www.gamestudio.example/announcement"
            permalink="/r/Games/comments/abc123/new_rpg/"
            thumbnail-url="https://preview.redd.it/abc123.jpg"></shreddit-post>
        <shreddit-post
            post-title="Weekly discussion thread"
            permalink="/r/Games/comments/def456/weekly/"></shreddit-post>
        <shreddit-post
            content-href="https://example.com/untitled"></shreddit-post>"#;

    #[test]
    fn test_parse_listing_reads_attributes() {
        let candidates = parse_listing(LISTING, 5).unwrap();
        assert_eq!(candidates.len(), 2, "post without a title is skipped");
        assert_eq!(candidates[0].raw_title, "New RPG announced at last");
        assert_eq!(
            candidates[0].href,
            "https://www.gamestudio.example/announcement"
        );
        assert_eq!(
            candidates[0].image.as_deref(),
            Some("https://preview.redd.it/abc123.jpg")
        );
    }

    #[test]
    fn test_parse_listing_permalink_fallback() {
        let candidates = parse_listing(LISTING, 5).unwrap();
        assert_eq!(candidates[1].href, "/r/Games/comments/def456/weekly/");
        assert_eq!(candidates[1].image, None);
    }

    #[test]
    fn test_parse_listing_no_posts_is_parse_failure() {
        assert!(matches!(
            parse_listing("<div>login required</div>", 2).unwrap_err(),
            FeedError::Parse { .. }
        ));
    }

    #[tokio::test]
    async fn test_latest_resolves_permalinks_against_reddit() {
        let fetcher = StaticFetcher::new().with_page(LISTING_URL, LISTING);
        let adapter = RedditGamesAdapter::new(Arc::new(fetcher));

        let items = adapter.latest(5).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://www.gamestudio.example/announcement");
        assert_eq!(
            items[1].url,
            "https://www.reddit.com/r/Games/comments/def456/weekly/"
        );
        assert!(items.iter().all(|item| item.time.is_none()));
    }
}
