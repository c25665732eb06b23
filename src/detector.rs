//! Dedup/change classification for incoming incidents.

use serde::Serialize;

use crate::incident::Incident;

/// Outcome of comparing an incoming incident against the stored record
/// for the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    New,
    Changed,
    Unchanged,
}

impl Classification {
    /// New and Changed trigger a store upsert, a broadcast, and a
    /// notification; Unchanged is dropped with no side effects.
    pub fn is_noteworthy(self) -> bool {
        matches!(self, Classification::New | Classification::Changed)
    }
}

/// Classify an incoming incident against the prior record, if any.
///
/// Only the `resolved` flag participates in the Changed/Unchanged
/// decision: title or content drift alone is Unchanged. The flag is also
/// allowed to flip back to false if the feed regresses; no monotonicity
/// guard is applied.
pub fn classify(existing: Option<&Incident>, incoming: &Incident) -> Classification {
    match existing {
        None => Classification::New,
        Some(prior) if prior.resolved != incoming.resolved => Classification::Changed,
        Some(_) => Classification::Unchanged,
    }
}
