//! Aggregation scheduler: drives fetch → filter → dispatch cycles per feed.
//!
//! Each logical feed (the news feed, the gaming feed, …) binds an ordered
//! list of source adapters, a poll interval, a ledger retention policy, and
//! a rebindable destination. The scheduler owns the delivery ledger
//! outright — adapters never see it — and runs one timer task per feed.
//!
//! # Cycle discipline
//!
//! A feed is either idle or running one cycle; cycles never overlap for
//! the same feed. The timer takes the per-feed cycle lock with `try_lock`
//! and *drops* a tick that lands mid-cycle, while on-demand triggers await
//! the lock so the caller blocks until their cycle completes. Both paths
//! run the identical cycle function — there is no separate code path that
//! could diverge on deduplication behavior.
//!
//! Timers do not fire until the host signals readiness through the watch
//! gate handed to [`FeedScheduler::spawn`]. Stopping a feed ends its timer
//! between cycles and refuses further triggers; an in-flight cycle always
//! runs to completion, because interrupting between dispatch and the
//! ledger update would lose the idempotence guarantee.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatchError;
use crate::ledger::{DeliveryLedger, LedgerPolicy};
use crate::models::NewsItem;
use crate::scrapers::SourceAdapter;
use crate::sink::DispatchSink;

/// Static configuration of one logical feed.
pub struct FeedConfig {
    /// Logical feed name; also the ledger partition key.
    pub name: String,
    /// Adapters polled each cycle, in configured order.
    pub adapters: Vec<Box<dyn SourceAdapter>>,
    /// Time between timer-driven cycles.
    pub interval: Duration,
    /// Maximum items requested from each adapter per cycle.
    pub item_limit: usize,
    /// How the feed's delivered-key set evolves across cycles.
    pub retention: LedgerPolicy,
}

struct FeedRuntime {
    config: FeedConfig,
    destination: RwLock<Option<String>>,
    cycle: Mutex<()>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

/// Control-surface failures; cycle-level failures never surface here.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unknown feed: {0}")]
    UnknownFeed(String),
    #[error("feed {0} is stopped")]
    FeedStopped(String),
}

/// Owns every feed runtime, the delivery ledger, and the dispatch sink.
pub struct FeedScheduler {
    feeds: HashMap<String, Arc<FeedRuntime>>,
    ledger: Arc<Mutex<DeliveryLedger>>,
    sink: Arc<dyn DispatchSink>,
}

impl FeedScheduler {
    pub fn new(sink: Arc<dyn DispatchSink>) -> Self {
        Self {
            feeds: HashMap::new(),
            ledger: Arc::new(Mutex::new(DeliveryLedger::new())),
            sink,
        }
    }

    /// Register a feed. Exactly one runtime exists per logical feed for
    /// the process lifetime.
    pub fn add_feed(&mut self, config: FeedConfig) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let name = config.name.clone();
        self.feeds.insert(
            name,
            Arc::new(FeedRuntime {
                config,
                destination: RwLock::new(None),
                cycle: Mutex::new(()),
                stop_tx,
                stop_rx,
            }),
        );
    }

    pub fn feed_names(&self) -> Vec<String> {
        self.feeds.keys().cloned().collect()
    }

    /// Bind (or rebind) the destination that receives this feed's items.
    pub async fn bind_destination(
        &self,
        feed: &str,
        destination: &str,
    ) -> Result<(), SchedulerError> {
        let rt = self.runtime(feed)?;
        *rt.destination.write().await = Some(destination.to_string());
        info!(feed, "destination bound");
        Ok(())
    }

    /// Run one on-demand cycle, blocking until it completes.
    ///
    /// Shares the cycle lock (and the cycle function) with the timer path,
    /// so a trigger can never race a timer-driven cycle on the same feed.
    ///
    /// # Returns
    ///
    /// The number of items dispatched by the cycle.
    pub async fn trigger_now(&self, feed: &str) -> Result<usize, SchedulerError> {
        let rt = self.runtime(feed)?;
        if *rt.stop_rx.borrow() {
            return Err(SchedulerError::FeedStopped(feed.to_string()));
        }
        let _guard = rt.cycle.lock().await;
        Ok(run_cycle(rt, &self.ledger, self.sink.as_ref()).await)
    }

    /// Stop a feed: its timer ends between cycles and further triggers are
    /// refused. An in-flight cycle runs to completion.
    pub fn stop_feed(&self, feed: &str) -> Result<(), SchedulerError> {
        let rt = self.runtime(feed)?;
        rt.stop_tx.send_replace(true);
        Ok(())
    }

    /// Spawn one timer task per feed. No timer fires until `ready` turns
    /// true; ticks landing mid-cycle are dropped.
    pub fn spawn(&self, ready: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for rt in self.feeds.values() {
            let rt = Arc::clone(rt);
            let ledger = Arc::clone(&self.ledger);
            let sink = Arc::clone(&self.sink);
            let mut ready = ready.clone();
            let mut stop = rt.stop_rx.clone();
            handles.push(tokio::spawn(async move {
                if ready.wait_for(|open| *open).await.is_err() {
                    debug!(feed = %rt.config.name, "readiness gate dropped; starting anyway");
                }
                let mut ticker = tokio::time::interval(rt.config.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if *stop.borrow() {
                                break;
                            }
                            match rt.cycle.try_lock() {
                                Ok(_guard) => {
                                    let dispatched =
                                        run_cycle(&rt, &ledger, sink.as_ref()).await;
                                    debug!(feed = %rt.config.name, dispatched, "timer cycle finished");
                                }
                                Err(_) => {
                                    debug!(feed = %rt.config.name, "tick arrived mid-cycle; dropped");
                                }
                            }
                        }
                        changed = stop.changed() => {
                            if changed.is_err() || *stop.borrow() {
                                break;
                            }
                        }
                    }
                }
                info!(feed = %rt.config.name, "feed timer stopped");
            }));
        }
        handles
    }

    fn runtime(&self, feed: &str) -> Result<&Arc<FeedRuntime>, SchedulerError> {
        self.feeds
            .get(feed)
            .ok_or_else(|| SchedulerError::UnknownFeed(feed.to_string()))
    }

    #[cfg(test)]
    pub(crate) async fn ledger_len(&self, feed: &str) -> usize {
        self.ledger.lock().await.len(feed)
    }
}

/// One fetch → filter → dispatch pass for a feed.
///
/// Callers must hold the feed's cycle lock. Adapter failures are isolated:
/// one dead source never blocks the others, and an individual dispatch
/// failure leaves that item unmarked so the next cycle retries it.
#[instrument(level = "info", skip_all, fields(feed = %rt.config.name))]
async fn run_cycle(
    rt: &FeedRuntime,
    ledger: &Mutex<DeliveryLedger>,
    sink: &dyn DispatchSink,
) -> usize {
    let Some(destination) = rt.destination.read().await.clone() else {
        info!("no destination bound; skipping cycle");
        return 0;
    };

    // Fetch phase: sequential, in configured order, so the merged dispatch
    // order is deterministic without a separate merge step.
    let mut batches: Vec<Vec<NewsItem>> = Vec::new();
    let mut any_source_succeeded = false;
    for adapter in &rt.config.adapters {
        match adapter.latest(rt.config.item_limit).await {
            Ok(items) => {
                debug!(source = adapter.name(), count = items.len(), "source fetched");
                any_source_succeeded = true;
                batches.push(items);
            }
            Err(e) => {
                warn!(source = adapter.name(), error = %e, "source failed; remaining sources continue");
            }
        }
    }

    // Dispatch phase: adapters return newest-first, so each batch is
    // reversed to deliver oldest-first and read chronologically.
    let mut dispatched = 0usize;
    let mut observed_delivered: HashSet<String> = HashSet::new();
    for batch in batches {
        for item in batch.into_iter().rev() {
            let key = item.delivery_key();
            if !ledger.lock().await.is_new(&rt.config.name, &key) {
                observed_delivered.insert(key);
                continue;
            }
            match deliver_item(sink, &destination, &item).await {
                Ok(()) => {
                    ledger
                        .lock()
                        .await
                        .mark_delivered(&rt.config.name, key.clone());
                    observed_delivered.insert(key);
                    dispatched += 1;
                }
                Err(e) => {
                    warn!(url = %item.url, error = %e, "dispatch failed; item retried next cycle");
                }
            }
        }
    }

    // Retention phase: bounded feeds forget everything not observed in
    // delivered state this cycle. Skipped when every source failed, so a
    // transient outage cannot wipe the ledger and cause a re-notification
    // storm when the sources come back.
    if rt.config.retention == LedgerPolicy::ReplaceEachCycle && any_source_succeeded {
        let mut ledger = ledger.lock().await;
        ledger.retain(&rt.config.name, observed_delivered);
        debug!(
            tracked = ledger.len(&rt.config.name),
            "ledger replaced with this cycle's delivered keys"
        );
    }

    info!(dispatched, "cycle complete");
    dispatched
}

/// Deliver one item, downgrading a thumbnail rejection into exactly one
/// image-stripped resend.
async fn deliver_item(
    sink: &dyn DispatchSink,
    destination: &str,
    item: &NewsItem,
) -> Result<(), DispatchError> {
    match sink.deliver(destination, item).await {
        Err(e) if e.is_thumbnail_rejection() && item.image.is_some() => {
            warn!(url = %item.url, "thumbnail rejected; resending without image");
            sink.deliver(destination, &item.without_image()).await
        }
        other => other,
    }
}
