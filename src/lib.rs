// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod broadcast;
pub mod config;
pub mod detector;
pub mod incident;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::broadcast::Broadcaster;
pub use crate::detector::Classification;
pub use crate::incident::Incident;
pub use crate::ingest::Pipeline;
pub use crate::store::IncidentStore;
