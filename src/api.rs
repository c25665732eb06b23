//! HTTP surface: JSON pull endpoint, SSE push endpoint, and the
//! simulation endpoints that exercise the pipeline without the live feed.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::Stream;
use serde_json::json;
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tower_http::cors::CorsLayer;

use crate::broadcast::{Broadcaster, SseMessage};
use crate::detector::Classification;
use crate::ingest::types::RawItem;
use crate::ingest::{self, Pipeline};

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/incidents", get(incidents))
        .route("/events", get(events))
        .route("/simulate/incident", post(simulate_incident))
        .route("/simulate/resolve", post(simulate_resolve))
        .layer(CorsLayer::very_permissive())
        .with_state(pipeline)
}

/// Pull endpoint: the current snapshot plus the derived active flag.
async fn incidents(State(pipeline): State<Pipeline>) -> Json<serde_json::Value> {
    Json(pipeline.snapshot_payload())
}

/// Adapter from the broadcaster's channel to an SSE body; deregisters the
/// subscriber when the transport drops the stream.
struct EventStream {
    rx: UnboundedReceiver<SseMessage>,
    id: u64,
    broadcaster: Arc<Broadcaster>,
}

impl Stream for EventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(msg)) => Poll::Ready(Some(Ok(Event::default()
                .event(msg.event)
                .data(msg.data.to_string())))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.broadcaster.leave(self.id);
    }
}

/// Push endpoint: one `snapshot` event at join, then an `incident` event
/// per new/changed classification.
async fn events(
    State(pipeline): State<Pipeline>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = pipeline.broadcaster.join(|| pipeline.snapshot_payload());
    Sse::new(EventStream {
        rx,
        id,
        broadcaster: pipeline.broadcaster.clone(),
    })
    .keep_alive(KeepAlive::default())
}

/// Inject a raw-item-shaped incident through the identical
/// classify → store → broadcast → notify path as real feed data.
async fn simulate_incident(
    State(pipeline): State<Pipeline>,
    Json(raw): Json<RawItem>,
) -> impl IntoResponse {
    match ingest::apply_item(&pipeline, &raw) {
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "item has no derivable identity" })),
        ),
        Some(classification) => (
            StatusCode::OK,
            Json(json!({
                "classification": classification,
                "hasActiveIssue": pipeline.store.has_active_issue(),
            })),
        ),
    }
}

#[derive(serde::Deserialize)]
struct ResolveReq {
    identity: String,
}

/// Mark a stored identity resolved by re-entering the pipeline with the
/// content carrying the resolution marker; never a side path.
async fn simulate_resolve(
    State(pipeline): State<Pipeline>,
    Json(body): Json<ResolveReq>,
) -> impl IntoResponse {
    let Some(existing) = pipeline.store.get(&body.identity) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown identity" })),
        );
    };

    let content = if crate::incident::is_resolved(&existing.content) {
        existing.content.clone()
    } else {
        format!("{}\n\nStatus: Resolved", existing.content)
    };
    let raw = RawItem {
        guid: Some(existing.identity.clone()),
        title: Some(existing.title.clone()),
        link: Some(existing.link.clone()),
        pub_date: Some(existing.published_at.clone()),
        content: Some(content),
        description: None,
    };

    let classification = ingest::apply_item(&pipeline, &raw).unwrap_or(Classification::Unchanged);
    (
        StatusCode::OK,
        Json(json!({
            "classification": classification,
            "hasActiveIssue": pipeline.store.has_active_issue(),
        })),
    )
}
