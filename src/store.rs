//! store.rs — authoritative in-memory incident map, keyed by identity.
//!
//! Mutated only from the ingest path; read concurrently by snapshot
//! requests, so every operation takes the one mutex and readers never see
//! a partially written record. State is process-lifetime only: incidents
//! are never deleted, resolved ones stay visible and flagged.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::detector::{self, Classification};
use crate::incident::Incident;

#[derive(Debug, Default)]
pub struct IncidentStore {
    inner: Mutex<HashMap<String, Incident>>,
}

impl IncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replace; returns the prior record for the identity.
    /// Latest write wins, fields are never merged.
    pub fn upsert(&self, incident: Incident) -> Option<Incident> {
        let mut map = self.inner.lock().expect("incident store mutex poisoned");
        map.insert(incident.identity.clone(), incident)
    }

    /// Classify against the current record and, when noteworthy, upsert
    /// in the same lock acquisition. Concurrent writers for one identity
    /// therefore cannot both observe the pre-transition state, keeping
    /// notifications at most one per state transition.
    pub fn classify_and_upsert(&self, incoming: &Incident) -> Classification {
        let mut map = self.inner.lock().expect("incident store mutex poisoned");
        let classification = detector::classify(map.get(&incoming.identity), incoming);
        if classification.is_noteworthy() {
            map.insert(incoming.identity.clone(), incoming.clone());
        }
        classification
    }

    pub fn get(&self, identity: &str) -> Option<Incident> {
        let map = self.inner.lock().expect("incident store mutex poisoned");
        map.get(identity).cloned()
    }

    /// Full current list, most recent first. RFC-3339 strings compare
    /// lexicographically in chronological order, so a plain string sort
    /// suffices.
    pub fn snapshot(&self) -> Vec<Incident> {
        let map = self.inner.lock().expect("incident store mutex poisoned");
        let mut list: Vec<Incident> = map.values().cloned().collect();
        list.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        list
    }

    /// True iff any stored incident is unresolved. Recomputed on every
    /// call, never cached.
    pub fn has_active_issue(&self) -> bool {
        let map = self.inner.lock().expect("incident store mutex poisoned");
        map.values().any(|i| !i.resolved)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("incident store mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(identity: &str, published_at: &str, resolved: bool) -> Incident {
        Incident {
            identity: identity.into(),
            title: format!("incident {identity}"),
            link: "https://status.example.com/i".into(),
            content: String::new(),
            published_at: published_at.into(),
            resolved,
        }
    }

    #[test]
    fn snapshot_orders_by_published_at_descending() {
        let store = IncidentStore::new();
        store.upsert(incident("a", "2024-01-03T00:00:00.000Z", true));
        store.upsert(incident("b", "2024-01-01T00:00:00.000Z", true));
        store.upsert(incident("c", "2024-01-02T00:00:00.000Z", true));

        let snap = store.snapshot();
        let dates: Vec<&str> = snap.iter().map(|i| i.published_at.as_str()).collect();
        assert_eq!(
            dates,
            vec![
                "2024-01-03T00:00:00.000Z",
                "2024-01-02T00:00:00.000Z",
                "2024-01-01T00:00:00.000Z",
            ]
        );
    }

    #[test]
    fn upsert_replaces_wholesale_and_keeps_one_record_per_identity() {
        let store = IncidentStore::new();
        store.upsert(incident("a", "2024-01-01T00:00:00.000Z", false));
        let prior = store.upsert(incident("a", "2024-01-01T00:00:00.000Z", true));

        assert_eq!(store.len(), 1);
        assert!(!prior.unwrap().resolved);
        assert!(store.get("a").unwrap().resolved);
    }

    #[test]
    fn classify_and_upsert_stores_only_noteworthy_records() {
        let store = IncidentStore::new();
        let active = incident("a", "2024-01-01T00:00:00.000Z", false);
        assert_eq!(store.classify_and_upsert(&active), Classification::New);
        assert_eq!(store.classify_and_upsert(&active), Classification::Unchanged);
        assert_eq!(store.len(), 1);

        let resolved = incident("a", "2024-01-01T00:00:00.000Z", true);
        assert_eq!(store.classify_and_upsert(&resolved), Classification::Changed);
        assert!(store.get("a").unwrap().resolved);
    }

    #[test]
    fn has_active_issue_tracks_unresolved_records() {
        let store = IncidentStore::new();
        assert!(!store.has_active_issue());

        store.upsert(incident("a", "2024-01-01T00:00:00.000Z", false));
        assert!(store.has_active_issue());

        store.upsert(incident("a", "2024-01-01T00:00:00.000Z", true));
        assert!(!store.has_active_issue());
    }
}
