//! Command-line interface definitions for News Courier.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Webhook URLs can be provided via command-line flags or environment
//! variables; everything else has a sensible default.

use clap::Parser;

/// Command-line arguments for the News Courier application.
///
/// # Examples
///
/// ```sh
/// # Run the scheduler with both feeds bound
/// news_courier --news-webhook-url https://chat.example.com/hooks/aaa \
///              --gaming-webhook-url https://chat.example.com/hooks/bbb
///
/// # Faster news polling, one item per source
/// news_courier --news-interval-secs 600 --item-limit 1
///
/// # Single on-demand pass over every feed, then exit
/// news_courier --once
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Webhook URL that receives the news feed (ltn, tvbs, ettoday)
    #[arg(long, env = "NEWS_WEBHOOK_URL")]
    pub news_webhook_url: Option<String>,

    /// Webhook URL that receives the gaming feed (r/Games)
    #[arg(long, env = "GAMING_WEBHOOK_URL")]
    pub gaming_webhook_url: Option<String>,

    /// Seconds between timer-driven cycles of the news feed
    #[arg(long, default_value_t = 3600)]
    pub news_interval_secs: u64,

    /// Seconds between timer-driven cycles of the gaming feed
    #[arg(long, default_value_t = 3600)]
    pub gaming_interval_secs: u64,

    /// Maximum items taken from each news source per cycle
    #[arg(short = 'l', long, default_value_t = 3)]
    pub item_limit: usize,

    /// Maximum items taken from the gaming source per cycle
    #[arg(long, default_value_t = 2)]
    pub gaming_item_limit: usize,

    /// Timeout for every outgoing HTTP request, in seconds
    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Run one on-demand cycle for every feed and exit
    #[arg(long)]
    pub once: bool,
}
