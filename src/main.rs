//! # News Courier
//!
//! A scheduled aggregation pipeline that watches a fixed set of
//! breaking-news listing pages, normalizes fresh headlines into a common
//! record, filters out items already delivered, and posts the remainder to
//! chat-channel webhooks.
//!
//! ## Features
//!
//! - Scrapes latest items from LTN, TVBS, ETtoday, and Reddit r/Games,
//!   each with layered selector fallbacks against markup drift
//! - Normalizes headlines, `HH:MM` publication times, and relative URLs
//! - Suppresses duplicate notifications per feed across polling cycles
//! - Delivers oldest-first so channels read chronologically
//!
//! ## Usage
//!
//! ```sh
//! news_courier --news-webhook-url https://chat.example.com/hooks/aaa
//! ```
//!
//! ## Architecture
//!
//! Two logical feeds run on independent timers sharing one HTTP client:
//! 1. **Fetch**: each feed's source adapters pull their listing pages
//! 2. **Filter**: the delivery ledger drops already-dispatched items
//! 3. **Dispatch**: survivors are posted oldest-first to the bound webhook

use clap::Parser;
use futures::future;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod error;
mod fetch;
mod ledger;
mod models;
mod normalize;
mod scheduler;
mod scrapers;
mod sink;

use cli::Cli;
use fetch::{HttpFetcher, PageFetcher};
use ledger::LedgerPolicy;
use scheduler::{FeedConfig, FeedScheduler};
use scrapers::SourceId;
use sink::WebhookSink;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_courier starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(
        news_interval_secs = args.news_interval_secs,
        gaming_interval_secs = args.gaming_interval_secs,
        item_limit = args.item_limit,
        once = args.once,
        "Parsed CLI arguments"
    );

    let timeout = Duration::from_secs(args.request_timeout_secs);
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(timeout));
    let sink = Arc::new(WebhookSink::new(timeout));

    // ---- Configure feeds ----
    // The news feed replaces its ledger each cycle (bounded memory; an item
    // absent for one full cycle re-notifies if it reappears). The gaming
    // feed accumulates: r/Games churns slowly and re-notification there
    // would be noisier than the negligible memory growth.
    let mut scheduler = FeedScheduler::new(sink);
    scheduler.add_feed(FeedConfig {
        name: "news".to_string(),
        adapters: vec![
            SourceId::Ltn.build(Arc::clone(&fetcher)),
            SourceId::Tvbs.build(Arc::clone(&fetcher)),
            SourceId::Ettoday.build(Arc::clone(&fetcher)),
        ],
        interval: Duration::from_secs(args.news_interval_secs),
        item_limit: args.item_limit,
        retention: LedgerPolicy::ReplaceEachCycle,
    });
    scheduler.add_feed(FeedConfig {
        name: "gaming".to_string(),
        adapters: vec![SourceId::RedditGames.build(Arc::clone(&fetcher))],
        interval: Duration::from_secs(args.gaming_interval_secs),
        item_limit: args.gaming_item_limit,
        retention: LedgerPolicy::Accumulate,
    });

    // ---- Bind destinations ----
    match &args.news_webhook_url {
        Some(url) => scheduler.bind_destination("news", url).await?,
        None => warn!(feed = "news", "no webhook configured; feed cycles will be no-ops"),
    }
    match &args.gaming_webhook_url {
        Some(url) => scheduler.bind_destination("gaming", url).await?,
        None => warn!(feed = "gaming", "no webhook configured; feed cycles will be no-ops"),
    }

    // ---- On-demand mode ----
    if args.once {
        for feed in ["news", "gaming"] {
            let dispatched = scheduler.trigger_now(feed).await?;
            info!(feed, dispatched, "on-demand cycle complete");
        }
        info!(elapsed_secs = start_time.elapsed().as_secs(), "Execution complete");
        return Ok(());
    }

    // ---- Scheduled mode ----
    // Timers hold until setup is finished, then the gate opens.
    let (ready_tx, ready_rx) = watch::channel(false);
    let handles = scheduler.spawn(&ready_rx);
    ready_tx.send_replace(true);
    info!(feeds = handles.len(), "scheduler running; Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested; stopping feed timers");
    for feed in scheduler.feed_names() {
        if let Err(e) = scheduler.stop_feed(&feed) {
            warn!(feed, error = %e, "failed to stop feed");
        }
    }
    let _ = future::join_all(handles).await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        "Execution complete"
    );

    Ok(())
}
