//! Human-readable sections

use std::fmt::Display;
use std::io::Write;

use colored::Colorize;

use crate::advisor::Action;
use crate::core::{Marker, SearchOutcome, SurfaceSnapshot};
use crate::error::Result;
use crate::plan::{CompiledPlan, SearchPlan};

const SNIPPET_CHARS: usize = 180;
const HISTOGRAM_ROWS: usize = 5;
const DERIVATION_ROWS: usize = 10;

fn heading(out: &mut impl Write, title: &str, leading_blank: bool) -> Result<()> {
    if leading_blank {
        writeln!(out)?;
    }
    writeln!(out, "{}", title.bold())?;
    Ok(())
}

fn opt<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

/// Cap at `n` characters, marking the cut with an ellipsis
fn trim(text: &str, n: usize) -> String {
    if text.chars().count() <= n {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(n.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub(super) fn compiled_plan(out: &mut impl Write, plan: &CompiledPlan) -> Result<()> {
    heading(out, "Compiled Plan", false)?;
    writeln!(out, "- intent_hash: {}", plan.intent_hash)?;
    writeln!(out)?;
    Ok(())
}

pub(super) fn snapshot(out: &mut impl Write, snapshot: &SurfaceSnapshot) -> Result<()> {
    heading(out, "Surface Snapshot", false)?;
    writeln!(out, "- root: {}", snapshot.root.resolved)?;
    match &snapshot.marker {
        Marker::Vcs { head, dirty } => {
            writeln!(out, "- marker: vcs head={} dirty={}", head, opt(*dirty))?
        }
        Marker::ContentHash { hash } => writeln!(out, "- marker: content_hash {hash}")?,
    }

    let listing = &snapshot.listing;
    match &listing.error {
        Some(err) => writeln!(
            out,
            "- listing: {} ok={} ({})",
            listing.used_tool,
            listing.ok,
            err.yellow()
        )?,
        None => writeln!(out, "- listing: {} ok={}", listing.used_tool, listing.ok)?,
    }
    writeln!(
        out,
        "- scope_files: {} truncated={}",
        snapshot.file_count, snapshot.truncated
    )?;

    if !snapshot.dominant_extensions.is_empty() {
        let exts: Vec<String> = snapshot
            .dominant_extensions
            .iter()
            .take(HISTOGRAM_ROWS)
            .map(|e| format!("{}={}", e.ext, e.count))
            .collect();
        writeln!(out, "- top_ext: {}", exts.join(", "))?;
    }
    if !snapshot.top_level_dirs.is_empty() {
        let dirs: Vec<String> = snapshot
            .top_level_dirs
            .iter()
            .take(HISTOGRAM_ROWS)
            .map(|d| format!("{}={}", d.dir, d.file_count))
            .collect();
        writeln!(out, "- top_dirs: {}", dirs.join(", "))?;
    }
    if let Some(hotspots) = snapshot.recent_change_hotspots.as_ref().filter(|h| !h.is_empty()) {
        let spots: Vec<String> = hotspots
            .iter()
            .take(HISTOGRAM_ROWS)
            .map(|h| format!("{}={}", h.dir, h.touched_files))
            .collect();
        writeln!(out, "- hotspots: {}", spots.join(", "))?;
    }
    Ok(())
}

pub(super) fn search_plan(out: &mut impl Write, plan: &SearchPlan) -> Result<()> {
    heading(out, "Search Plan", true)?;
    writeln!(out, "- root: {}", plan.root.resolved)?;
    writeln!(out, "- strategy: {}", plan.strategy)?;
    writeln!(out, "- terms: {}", plan.terms.base.join(", "))?;
    writeln!(out, "- include_globs: {}", list(&plan.scope.include_globs))?;
    writeln!(out, "- exclude_globs: {}", list(&plan.scope.exclude_globs))?;
    let m = &plan.matching;
    writeln!(
        out,
        "- match: mode={} case={} context={}",
        m.mode.as_str(),
        m.case.as_str(),
        m.context
    )?;
    let b = &plan.bounds;
    writeln!(
        out,
        "- bounds: max_lines={} max_probes={} max_derived={}",
        b.max_output_hits, b.max_probes, b.max_derived
    )?;
    let p = &plan.policy;
    writeln!(
        out,
        "- policy: hidden={} follow={} respect_ignore_files={} respect_vcs_ignore={} respect_global_ignore={}",
        p.search_hidden,
        p.follow_symlinks,
        p.respect_ignore_files,
        p.respect_vcs_ignore,
        p.respect_global_ignore
    )?;
    Ok(())
}

pub(super) fn outcome(out: &mut impl Write, outcome: &SearchOutcome) -> Result<()> {
    let summary = &outcome.summary;

    heading(out, "Results", true)?;
    writeln!(
        out,
        "- matches: {} files_with_matches: {} probes_run: {}",
        summary.matches, summary.files_with_matches, summary.probes_run
    )?;
    writeln!(
        out,
        "- scope_files: {} scope_truncated: {} output_truncated: {}",
        summary.scope_files, summary.scope_truncated, summary.truncated
    )?;
    if summary.matches == 0 {
        writeln!(out, "- no matches")?;
    } else {
        for hit in &outcome.hits {
            writeln!(
                out,
                "- {}:{}: {}",
                hit.path.cyan(),
                hit.line,
                trim(&hit.snippet, SNIPPET_CHARS)
            )?;
        }
    }

    heading(out, "Probe Ledger", true)?;
    for entry in &outcome.ledger {
        writeln!(
            out,
            "- {} phase={} hits={} files_searched={} patterns={}",
            entry.probe_id,
            entry.phase,
            entry.hit_count,
            opt(entry.files_searched),
            list(&entry.patterns)
        )?;
    }

    if let Some(derivation) = &outcome.derivation {
        heading(out, "Derivation Ledger", true)?;
        for e in derivation.entries.iter().take(DERIVATION_ROWS) {
            writeln!(
                out,
                "- {} count={} docs={} ratio={}",
                e.token, e.evidence_count, e.doc_count, e.doc_ratio
            )?;
        }
    }

    heading(out, "Next Step", true)?;
    let next = &outcome.next_step;
    match (next.action, next.axis) {
        (Action::Widen, Some(axis)) => {
            writeln!(out, "- widen axis={}: {}", axis.as_str(), next.note)?
        }
        _ => writeln!(out, "- read_next: {}", next.note)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_marks_cut() {
        assert_eq!(trim("short", 10), "short");
        let long = "x".repeat(200);
        let cut = trim(&long, 180);
        assert_eq!(cut.chars().count(), 180);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_trim_counts_chars_not_bytes() {
        let text = "é".repeat(5);
        assert_eq!(trim(&text, 5), text);
        assert_eq!(trim(&text, 3), "éé…");
    }
}
