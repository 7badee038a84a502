//! Parser for the engine's structured event stream (`rg --json`)
//!
//! Only `match` and `summary` events matter. Lines that are not valid JSON
//! are skipped.

use serde::Deserialize;
use tracing::debug;

use super::{RawHit, SearchOutput};
use crate::core::normalize_rel;

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MatchData {
    #[serde(default)]
    path: TextField,
    line_number: Option<u64>,
    #[serde(default)]
    lines: TextField,
}

#[derive(Debug, Default, Deserialize)]
struct TextField {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    #[serde(default)]
    stats: Option<Stats>,
}

#[derive(Debug, Deserialize)]
struct Stats {
    searches: Option<u64>,
    searches_with_match: Option<u64>,
}

/// Search/match counters folded across summary events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub searches: Option<u64>,
    pub searches_with_match: Option<u64>,
}

impl EventCounts {
    /// Keep the maximum value seen for each counter
    fn absorb(&mut self, stats: &Stats) {
        self.searches = max_opt(self.searches, stats.searches);
        self.searches_with_match = max_opt(self.searches_with_match, stats.searches_with_match);
    }
}

fn max_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Parse a full event stream into hits and counters
pub fn parse_events(stdout: &str) -> SearchOutput {
    let mut hits = Vec::new();
    let mut counts = EventCounts::default();

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let event: RawEvent = match serde_json::from_str(line) {
            Ok(ev) => ev,
            Err(e) => {
                debug!("Skipping unparsable event line: {}", e);
                continue;
            }
        };

        match event.kind.as_str() {
            "match" => {
                if let Some(hit) = parse_match(event.data) {
                    hits.push(hit);
                }
            }
            "summary" => {
                if let Ok(SummaryData { stats: Some(stats) }) = serde_json::from_value(event.data) {
                    counts.absorb(&stats);
                }
            }
            _ => {}
        }
    }

    SearchOutput {
        hits,
        files_searched: counts.searches,
        files_with_match: counts.searches_with_match,
    }
}

fn parse_match(data: serde_json::Value) -> Option<RawHit> {
    let data: MatchData = serde_json::from_value(data).ok()?;
    let path = data.path.text.filter(|p| !p.is_empty())?;
    let line = data.line_number?;
    let snippet = data
        .lines
        .text
        .unwrap_or_default()
        .trim_end_matches(['\n', '\r'])
        .to_string();

    Some(RawHit {
        path: normalize_rel(&path).to_string(),
        line,
        snippet,
    })
}
