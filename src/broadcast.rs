//! broadcast.rs — fan-out of incident events to live SSE subscribers.
//!
//! The subscriber list doubles as the publication lock: `join` delivers
//! the snapshot into the new subscriber's channel while holding it, so no
//! `publish` can interleave between snapshot and registration. A late
//! joiner therefore sees exactly the snapshot plus the live tail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const SNAPSHOT_EVENT: &str = "snapshot";
pub const INCIDENT_EVENT: &str = "incident";

/// One framed SSE message: event name plus JSON payload.
#[derive(Debug, Clone)]
pub struct SseMessage {
    pub event: &'static str,
    pub data: Value,
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    tx: UnboundedSender<SseMessage>,
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and synchronously queue its snapshot event.
    ///
    /// `snapshot` is evaluated under the subscriber lock; pass a closure
    /// that reads the store so the snapshot and the registration are one
    /// atomic step relative to `publish`.
    pub fn join<F>(&self, snapshot: F) -> (u64, UnboundedReceiver<SseMessage>)
    where
        F: FnOnce() -> Value,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        let mut subs = self.subscribers.lock().expect("subscriber mutex poisoned");
        let _ = tx.send(SseMessage {
            event: SNAPSHOT_EVENT,
            data: snapshot(),
        });
        subs.push(Subscriber { id, tx });
        (id, rx)
    }

    /// Deliver one event to every live subscriber, in insertion order.
    /// Subscribers whose receiver hung up are pruned here; a subscriber
    /// that disconnects mid-publish simply misses the event.
    pub fn publish(&self, event: &'static str, data: Value) {
        let mut subs = self.subscribers.lock().expect("subscriber mutex poisoned");
        subs.retain(|s| {
            s.tx.send(SseMessage {
                event,
                data: data.clone(),
            })
            .is_ok()
        });
    }

    /// Idempotent removal; unknown ids are a no-op.
    pub fn leave(&self, id: u64) {
        let mut subs = self.subscribers.lock().expect("subscriber mutex poisoned");
        subs.retain(|s| s.id != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber mutex poisoned")
            .len()
    }
}
