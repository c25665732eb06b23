//! Canonical incident record and the raw-item → incident normalizer.
//!
//! Normalization is a pure function of the raw feed item (plus an injected
//! "now" for the published-date fallback); it never touches shared state,
//! which keeps it unit-testable without any network access.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ingest::types::RawItem;

/// Title used when a feed item carries none.
pub const DEFAULT_TITLE: &str = "Status update";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Stable key correlating this incident across polls.
    pub identity: String,
    pub title: String,
    pub link: String,
    /// Raw (possibly HTML-bearing) body as published by the feed.
    pub content: String,
    /// RFC-3339 UTC; lexicographic order equals chronological order.
    pub published_at: String,
    pub resolved: bool,
}

fn resolved_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)Status:\s*Resolved").unwrap())
}

/// The only resolution signal: a case-insensitive "Status: Resolved"
/// marker somewhere in the content.
pub fn is_resolved(content: &str) -> bool {
    resolved_re().is_match(content)
}

/// Decode HTML entities and collapse whitespace. Titles only; incident
/// content is kept raw for the dashboard to render.
pub fn clean_title(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let decoded = html_escape::decode_html_entities(s).to_string();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Map a raw feed item into a canonical [`Incident`].
///
/// Identity fallback order is fixed and load-bearing: changing it changes
/// deduplication identity across restarts. It is, in order: explicit guid,
/// permalink, parsed ISO date, raw date string, title. An item where every
/// rung is empty yields `None` and is skipped by the caller.
pub fn normalize(raw: &RawItem, feed_url: &str, now: DateTime<Utc>) -> Option<Incident> {
    let parsed_date = raw.pub_date.as_deref().and_then(parse_published);
    let iso_date = parsed_date.map(to_iso);

    let identity = non_empty(&raw.guid)
        .or_else(|| non_empty(&raw.link))
        .or_else(|| iso_date.clone())
        .or_else(|| non_empty(&raw.pub_date))
        .or_else(|| non_empty(&raw.title))?;

    let content = non_empty(&raw.content)
        .or_else(|| non_empty(&raw.description))
        .unwrap_or_default();

    Some(Incident {
        identity,
        title: non_empty(&raw.title)
            .map(|t| clean_title(&t))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        link: non_empty(&raw.link).unwrap_or_else(|| feed_url.to_string()),
        resolved: is_resolved(&content),
        content,
        published_at: iso_date.unwrap_or_else(|| to_iso(now)),
    })
}
