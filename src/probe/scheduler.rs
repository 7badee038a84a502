//! Probe scheduler - strategy partitioning and a bounded worker pool
//!
//! Workers pull [`ProbeSpec`]s from a request channel and push results onto
//! a result channel. The pool is joined before the caller sees anything, and
//! results are re-sorted by probe id so completion order never leaks out.

use std::thread;

use crossbeam_channel::{bounded, unbounded};
use tracing::{debug, error};

use super::{ProbeFailure, ProbeRecord, ProbeResult, ProbeRunner, ProbeSpec, PHASE_BASE};
use crate::core::Strategy;

/// Hard ceiling on concurrent probes
pub const MAX_CONCURRENCY: usize = 8;

// ============================================================================
// Partitioning
// ============================================================================

/// Split patterns into `min(len, max_probes)` contiguous groups whose sizes
/// differ by at most one.
pub fn partition(patterns: &[String], max_probes: usize) -> Vec<Vec<String>> {
    if patterns.is_empty() {
        return Vec::new();
    }
    let groups = patterns.len().min(max_probes.max(1));
    let base = patterns.len() / groups;
    let extra = patterns.len() % groups;

    let mut out = Vec::with_capacity(groups);
    let mut start = 0;
    for i in 0..groups {
        let size = base + usize::from(i < extra);
        out.push(patterns[start..start + size].to_vec());
        start += size;
    }
    out
}

/// Phase-1 probes for a strategy
pub fn phase_one(strategy: Strategy, patterns: &[String], max_probes: usize) -> Vec<ProbeSpec> {
    match strategy {
        Strategy::Single | Strategy::Cascade => {
            vec![ProbeSpec::new(1, PHASE_BASE, patterns.to_vec())]
        }
        Strategy::Parallel => partition(patterns, max_probes)
            .into_iter()
            .enumerate()
            .map(|(i, group)| ProbeSpec::new(i as u32 + 1, PHASE_BASE, group))
            .collect(),
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Run every probe to completion; results come back in ascending id order
pub fn run_probes(runner: &ProbeRunner<'_>, specs: Vec<ProbeSpec>) -> Vec<ProbeResult> {
    if specs.len() <= 1 {
        return specs.iter().map(|spec| runner.run(spec)).collect();
    }

    let workers = specs.len().min(MAX_CONCURRENCY);
    debug!("Running {} probes on {} workers", specs.len(), workers);

    let (request_tx, request_rx) = bounded::<ProbeSpec>(specs.len());
    let (result_tx, result_rx) = unbounded::<ProbeResult>();

    for spec in &specs {
        // Capacity covers every probe; never blocks
        let _ = request_tx.send(spec.clone());
    }
    drop(request_tx);

    thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let request_rx = request_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move || {
                    for spec in request_rx.iter() {
                        if result_tx.send(runner.run(&spec)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            if handle.join().is_err() {
                error!("Probe worker panicked");
            }
        }
    });
    drop(result_tx);

    let mut results: Vec<ProbeResult> = result_rx.iter().collect();

    // A panicked worker leaves its probe without a result
    for spec in &specs {
        if !results.iter().any(|r| result_id(r) == spec.id) {
            results.push(Err(ProbeFailure {
                plan: ProbeRecord {
                    id: spec.id,
                    phase: spec.phase,
                    patterns: spec.patterns.clone(),
                    argv: Vec::new(),
                    cwd: runner.context().scope.root.resolved.clone(),
                },
                error: "probe worker panicked".to_string(),
            }));
        }
    }

    results.sort_by_key(result_id);
    results
}

fn result_id(result: &ProbeResult) -> super::ProbeId {
    match result {
        Ok(outcome) => outcome.entry.probe_id,
        Err(failure) => failure.plan.id,
    }
}
