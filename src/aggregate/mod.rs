//! Result aggregation - canonical ordering, output truncation, summary

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::{bound_cap, RootRef, Scope, SurfaceSnapshot};
use crate::probe::{Hit, ProbeLedgerEntry};

pub const RESULTS_SCHEMA: &str = "results_summary_v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsScope {
    pub root: RootRef,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
}

/// Counts always describe the full, untruncated result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsSummary {
    pub schema: &'static str,
    pub matches: usize,
    pub files_with_matches: usize,
    pub scope_files: usize,
    pub scope_truncated: bool,
    pub files_searched: Option<u64>,
    pub probes_run: usize,
    /// Whether emitted hits were cut at `max_output_hits`
    pub truncated: bool,
    pub scope: ResultsScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub summary: ResultsSummary,
    /// Hits to emit, in canonical order
    pub hits: Vec<Hit>,
}

/// Sort into (path, line, probe id) order
pub fn canonical_sort(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then(a.line.cmp(&b.line))
            .then(a.probe_id.cmp(&b.probe_id))
    });
}

/// Merge every probe's hits; negative `max_output_hits` means no cap
pub fn aggregate(
    mut hits: Vec<Hit>,
    ledger: &[ProbeLedgerEntry],
    snapshot: &SurfaceSnapshot,
    scope: &Scope,
    max_output_hits: i64,
) -> Aggregate {
    canonical_sort(&mut hits);

    let matches = hits.len();
    let files_with_matches = hits
        .iter()
        .map(|h| h.path.as_str())
        .filter(|p| !p.is_empty())
        .collect::<BTreeSet<_>>()
        .len();
    let files_searched = ledger.iter().filter_map(|e| e.files_searched).max();

    let mut truncated = false;
    if let Some(cap) = bound_cap(max_output_hits) {
        if hits.len() > cap {
            hits.truncate(cap);
            truncated = true;
        }
    }

    Aggregate {
        summary: ResultsSummary {
            schema: RESULTS_SCHEMA,
            matches,
            files_with_matches,
            scope_files: snapshot.file_count,
            scope_truncated: snapshot.truncated,
            files_searched,
            probes_run: ledger.len(),
            truncated,
            scope: ResultsScope {
                root: scope.root.clone(),
                include_globs: scope.include_globs.clone(),
                exclude_globs: scope.exclude_globs.clone(),
            },
        },
        hits,
    }
}
