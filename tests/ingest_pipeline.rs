// tests/ingest_pipeline.rs
//
// Pipeline-level properties: idempotent re-polls, identity stability,
// and the deliberate absence of a resolution-monotonicity guard.

use statuswatch::config::PollerConfig;
use statuswatch::detector::Classification;
use statuswatch::ingest::providers::status_rss::StatusRssProvider;
use statuswatch::ingest::types::RawItem;
use statuswatch::ingest::{self, Pipeline};

fn pipeline() -> Pipeline {
    Pipeline::new(&PollerConfig {
        feed_url: "https://status.example.com/feed.rss".into(),
        interval_secs: 15,
        webhook_url: None,
    })
}

fn raw(guid: &str, title: &str, content: &str) -> RawItem {
    RawItem {
        guid: Some(guid.into()),
        title: Some(title.into()),
        link: Some(format!("https://status.example.com/i/{guid}")),
        pub_date: Some("Wed, 01 May 2024 10:30:00 GMT".into()),
        content: Some(content.into()),
        description: None,
    }
}

#[tokio::test]
async fn repolling_an_unchanged_feed_is_idempotent() {
    let xml = include_str!("fixtures/status_rss.xml");
    let provider = StatusRssProvider::from_fixture(xml);
    let p = pipeline();

    let first = ingest::run_once(&provider, &p).await.expect("first poll");
    assert_eq!(first.fetched, 3);
    assert_eq!(first.new, 3);
    assert_eq!(p.store.len(), 3);

    // Second poll over identical content: no events, no store growth.
    let (_, mut rx) = p.broadcaster.join(|| p.snapshot_payload());
    let second = ingest::run_once(&provider, &p).await.expect("second poll");
    assert_eq!(second.new, 0);
    assert_eq!(second.changed, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(p.store.len(), 3);

    let snapshot = rx.try_recv().expect("join snapshot");
    assert_eq!(snapshot.event, "snapshot");
    assert!(rx.try_recv().is_err(), "re-poll must broadcast nothing");
}

#[tokio::test]
async fn same_guid_with_edited_title_is_the_same_incident() {
    let p = pipeline();
    assert_eq!(
        ingest::apply_item(&p, &raw("x1", "API degraded", "investigating")),
        Some(Classification::New)
    );
    assert_eq!(
        ingest::apply_item(&p, &raw("x1", "API degraded (update)", "investigating")),
        Some(Classification::Unchanged)
    );
    assert_eq!(p.store.len(), 1);
}

#[tokio::test]
async fn resolved_may_flip_back_to_active() {
    // Baseline behavior, not an omission: the feed is trusted even when
    // it regresses an incident from resolved back to active.
    let p = pipeline();
    ingest::apply_item(&p, &raw("x1", "API degraded", "Status: Resolved"));
    assert!(!p.store.has_active_issue());

    assert_eq!(
        ingest::apply_item(&p, &raw("x1", "API degraded", "investigating again")),
        Some(Classification::Changed)
    );
    assert!(p.store.has_active_issue());
    assert!(!p.store.get("x1").unwrap().resolved);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_injections_yield_one_new_per_identity() {
    // classify+upsert is a single lock acquisition, so racing writers
    // for one unseen identity cannot both observe the pre-transition
    // state and double-broadcast a single transition.
    let p = pipeline();
    let (_, mut rx) = p.broadcaster.join(|| p.snapshot_payload());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let p = p.clone();
        handles.push(tokio::spawn(async move {
            ingest::apply_item(&p, &raw("x1", "API degraded", "investigating"))
        }));
    }
    let mut news = 0;
    for h in handles {
        if h.await.unwrap() == Some(Classification::New) {
            news += 1;
        }
    }

    assert_eq!(news, 1, "exactly one writer may classify the identity New");
    assert_eq!(p.store.len(), 1);

    let _snapshot = rx.try_recv().unwrap();
    assert_eq!(rx.try_recv().unwrap().event, "incident");
    assert!(rx.try_recv().is_err(), "one transition, one broadcast");
}

#[tokio::test]
async fn malformed_items_skip_without_aborting_the_batch() {
    let p = pipeline();
    let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item><description>identityless noise</description></item>
  <item><guid>ok-1</guid><title>Fine</title><description>ok</description></item>
</channel></rss>"#;
    let provider = StatusRssProvider::from_fixture(xml);

    let report = ingest::run_once(&provider, &p).await.expect("poll");
    assert_eq!(report.fetched, 2);
    assert_eq!(report.malformed, 1);
    assert_eq!(report.new, 1);
    assert_eq!(p.store.len(), 1);
}
