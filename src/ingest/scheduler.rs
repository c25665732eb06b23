// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::types::FeedSource;
use crate::ingest::{run_once, Pipeline};

#[derive(Clone, Copy, Debug)]
pub struct PollerCfg {
    pub interval_secs: u64,
}

/// Spawn the recurring poll loop. The first cycle fires immediately; a
/// tick that lands while a cycle is still running is skipped outright
/// (`MissedTickBehavior::Skip`), so at most one fetch is ever in flight
/// and an unchanged feed costs one request per interval. Failures are
/// logged and the loop carries on; it never exits.
pub fn spawn_poller(
    cfg: PollerCfg,
    source: Arc<dyn FeedSource>,
    pipeline: Pipeline,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            poll_tick(source.as_ref(), &pipeline).await;
        }
    })
}

/// One scheduler cycle: run the pipeline and account for the outcome.
/// The sole place a failed cycle is counted and logged.
pub async fn poll_tick(source: &dyn FeedSource, pipeline: &Pipeline) {
    match run_once(source, pipeline).await {
        Ok(report) => {
            tracing::info!(
                target: "poller",
                fetched = report.fetched,
                new = report.new,
                changed = report.changed,
                unchanged = report.unchanged,
                malformed = report.malformed,
                "poll tick"
            );
        }
        Err(e) => {
            counter!("poll_fetch_errors_total").increment(1);
            tracing::warn!(source = source.name(), "status feed poll failed: {e:#}");
        }
    }
}
