// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde_json::json;

use crate::broadcast::{Broadcaster, INCIDENT_EVENT};
use crate::config::PollerConfig;
use crate::detector::Classification;
use crate::incident::{self, Incident};
use crate::ingest::types::{FeedSource, RawItem};
use crate::notify::{webhook::WebhookNotifier, StatusAlert};
use crate::store::IncidentStore;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poll_runs_total", "Completed poll cycles.");
        describe_counter!("poll_items_total", "Items parsed from the feed.");
        describe_counter!(
            "poll_malformed_total",
            "Items skipped for lacking a derivable identity."
        );
        describe_counter!("poll_new_total", "Incidents classified as new.");
        describe_counter!("poll_changed_total", "Incidents classified as changed.");
        describe_counter!(
            "poll_unchanged_total",
            "Incidents dropped as unchanged re-polls."
        );
        describe_counter!("poll_fetch_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("poll_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("poll_last_run_ts", "Unix ts when the poller last ran.");
    });
}

/// Injectable service bundle for the ingest path: the store, the fan-out
/// broadcaster, and the notification sink. Constructed once at startup
/// and shared with the transport layer; tests build fresh instances.
#[derive(Clone)]
pub struct Pipeline {
    pub store: Arc<IncidentStore>,
    pub broadcaster: Arc<Broadcaster>,
    pub notifier: Arc<WebhookNotifier>,
    pub feed_url: Arc<String>,
}

impl Pipeline {
    pub fn new(config: &PollerConfig) -> Self {
        Self {
            store: Arc::new(IncidentStore::new()),
            broadcaster: Arc::new(Broadcaster::new()),
            notifier: Arc::new(WebhookNotifier::new(config.webhook_url.clone())),
            feed_url: Arc::new(config.feed_url.clone()),
        }
    }

    /// Current snapshot payload: `{hasActiveIssue, incidents}`.
    pub fn snapshot_payload(&self) -> serde_json::Value {
        json!({
            "hasActiveIssue": self.store.has_active_issue(),
            "incidents": self.store.snapshot(),
        })
    }
}

/// Per-cycle tallies, logged by the scheduler.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub malformed: usize,
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
}

/// Run one already-normalized incident through classify → store →
/// broadcast → notify. Simulated and real feed data both land here.
pub fn apply_incident(pipeline: &Pipeline, incoming: Incident) -> Classification {
    // Classify and upsert under one store lock; see
    // IncidentStore::classify_and_upsert.
    let classification = pipeline.store.classify_and_upsert(&incoming);
    if !classification.is_noteworthy() {
        counter!("poll_unchanged_total").increment(1);
        return classification;
    }

    match classification {
        Classification::New => counter!("poll_new_total").increment(1),
        Classification::Changed => counter!("poll_changed_total").increment(1),
        Classification::Unchanged => unreachable!("filtered above"),
    }

    let has_active_issue = pipeline.store.has_active_issue();
    pipeline.broadcaster.publish(
        INCIDENT_EVENT,
        json!({ "incident": incoming, "hasActiveIssue": has_active_issue }),
    );

    // Fire-and-forget; dispatch latency and failures stay off the hot path.
    if pipeline.notifier.is_enabled() {
        let notifier = pipeline.notifier.clone();
        let alert = StatusAlert::for_incident(&incoming);
        tokio::spawn(async move {
            if let Err(e) = notifier.dispatch(&alert).await {
                tracing::warn!("notification dispatch failed: {e:#}");
            }
        });
    }

    classification
}

/// Normalize a raw item and apply it. `None` means the item had no
/// derivable identity and was skipped.
pub fn apply_item(pipeline: &Pipeline, raw: &RawItem) -> Option<Classification> {
    let incident = incident::normalize(raw, &pipeline.feed_url, chrono::Utc::now())?;
    Some(apply_incident(pipeline, incident))
}

/// One poll cycle: fetch, then normalize/classify/apply each item.
/// A fetch or parse failure aborts the whole cycle with no store
/// mutation; a single malformed item only skips itself.
pub async fn run_once(source: &dyn FeedSource, pipeline: &Pipeline) -> Result<IngestReport> {
    ensure_metrics_described();

    let items = source.fetch_latest().await?;

    let mut report = IngestReport {
        fetched: items.len(),
        ..Default::default()
    };
    for raw in &items {
        match apply_item(pipeline, raw) {
            None => {
                report.malformed += 1;
                counter!("poll_malformed_total").increment(1);
            }
            Some(Classification::New) => report.new += 1,
            Some(Classification::Changed) => report.changed += 1,
            Some(Classification::Unchanged) => report.unchanged += 1,
        }
    }

    counter!("poll_runs_total").increment(1);
    gauge!("poll_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pipeline() -> Pipeline {
        Pipeline::new(&PollerConfig {
            feed_url: "https://status.example.com/feed.rss".into(),
            interval_secs: 15,
            webhook_url: None,
        })
    }

    fn raw(guid: &str, content: &str) -> RawItem {
        RawItem {
            guid: Some(guid.into()),
            title: Some("API degraded".into()),
            link: Some("https://status.example.com/i/1".into()),
            pub_date: Some("Wed, 01 May 2024 10:30:00 GMT".into()),
            content: Some(content.into()),
            description: None,
        }
    }

    #[test]
    fn unchanged_items_have_zero_side_effects() {
        let p = test_pipeline();
        assert_eq!(
            apply_item(&p, &raw("g-1", "investigating")),
            Some(Classification::New)
        );

        let (_, mut rx) = p.broadcaster.join(|| p.snapshot_payload());
        assert_eq!(
            apply_item(&p, &raw("g-1", "investigating")),
            Some(Classification::Unchanged)
        );

        let _snapshot = rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err(), "no event for an unchanged re-poll");
        assert_eq!(p.store.len(), 1);
    }

    #[test]
    fn resolved_flip_broadcasts_exactly_one_event() {
        let p = test_pipeline();
        apply_item(&p, &raw("g-1", "investigating"));

        let (_, mut rx) = p.broadcaster.join(|| p.snapshot_payload());
        assert_eq!(
            apply_item(&p, &raw("g-1", "Status: Resolved")),
            Some(Classification::Changed)
        );

        let _snapshot = rx.try_recv().unwrap();
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.data["hasActiveIssue"], serde_json::json!(false));
        assert_eq!(ev.data["incident"]["identity"], serde_json::json!("g-1"));
        assert!(rx.try_recv().is_err());
        assert_eq!(p.store.len(), 1);
    }

    #[test]
    fn items_without_identity_are_skipped() {
        let p = test_pipeline();
        assert_eq!(apply_item(&p, &RawItem::default()), None);
        assert!(p.store.is_empty());
    }
}
