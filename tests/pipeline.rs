//! End-to-end pipeline tests over an in-process backend

mod common;

use common::{engine, request, write_tree, FakeBackend};
use grape::advisor::{Action, Axis};
use grape::core::{Marker, Strategy, WALK_FALLBACK_TOOL};
use grape::error::EXIT_RUNTIME;
use grape::report::{OutputFormat, Reporter};
use grape::GrapeError;
use serde_json::Value;
use tempfile::tempdir;

#[test]
fn test_single_probe_counts_every_hit() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[("a.py", "foo = 1\nbar = 2\nprint(foo)\n"), ("b.py", "foo()\n"), ("c.py", "nothing\n")],
    );
    let engine = engine(FakeBackend::default(), dir.path());

    let (prepared, outcome) = engine.run(&request(&["foo"], Strategy::Single)).unwrap();

    assert_eq!(prepared.snapshot.file_count, 3);
    assert_eq!(outcome.summary.matches, 3);
    assert_eq!(outcome.summary.files_with_matches, 2);
    assert_eq!(outcome.summary.probes_run, 1);
    assert_eq!(outcome.summary.files_searched, Some(3));
    assert!(!outcome.summary.truncated);

    assert_eq!(outcome.ledger.len(), 1);
    assert_eq!(outcome.ledger[0].probe_id.to_string(), "P1");
    assert_eq!(outcome.ledger[0].hit_count, 3);
    assert_eq!(outcome.ledger[0].cwd, ".");

    let keys: Vec<(&str, u64)> = outcome.hits.iter().map(|h| (h.path.as_str(), h.line)).collect();
    assert_eq!(keys, vec![("a.py", 1), ("a.py", 3), ("b.py", 1)]);
    assert!(outcome.derivation.is_none());
    assert_eq!(outcome.next_step.action, Action::ReadNext);
}

#[test]
fn test_parallel_partitions_patterns_contiguously() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("src/lib.rs", "alpha\nbeta\ngamma\n")]);
    let engine = engine(FakeBackend::default(), dir.path());

    let mut req = request(&["alpha", "beta", "gamma"], Strategy::Parallel);
    req.max_probes = 2;
    let (_, outcome) = engine.run(&req).unwrap();

    let groups: Vec<Vec<String>> = outcome.ledger.iter().map(|e| e.patterns.clone()).collect();
    assert_eq!(groups, vec![vec!["alpha", "beta"], vec!["gamma"]]);
    let ids: Vec<String> = outcome.ledger.iter().map(|e| e.probe_id.to_string()).collect();
    assert_eq!(ids, vec!["P1", "P2"]);
    assert_eq!(outcome.summary.matches, 3);
    assert_eq!(outcome.summary.probes_run, 2);
}

#[test]
fn test_parallel_hits_attributed_to_their_probe() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("x.txt", "one\ntwo\n")]);
    let engine = engine(FakeBackend::default(), dir.path());

    let (_, outcome) = engine
        .run(&request(&["two", "one"], Strategy::Parallel))
        .unwrap();

    let attributed: Vec<(u64, String)> = outcome
        .hits
        .iter()
        .map(|h| (h.line, h.probe_id.to_string()))
        .collect();
    assert_eq!(attributed, vec![(1, "P2".to_string()), (2, "P1".to_string())]);
}

#[test]
fn test_lowest_failing_probe_aborts_the_run() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("x.txt", "a b c d\n")]);
    let engine = engine(FakeBackend::failing_on(&["b", "d"]), dir.path());

    let err = engine
        .run(&request(&["a", "b", "c", "d"], Strategy::Parallel))
        .unwrap_err();

    assert_eq!(err.exit_code(), EXIT_RUNTIME);
    match err {
        GrapeError::ProbeFailed(failure) => {
            assert_eq!(failure.plan.id.to_string(), "P2");
            assert_eq!(failure.plan.patterns, vec!["b"]);
            assert_eq!(failure.error, "fake refused b");
        }
        other => panic!("expected probe failure, got {other:?}"),
    }
}

#[test]
fn test_cascade_runs_derived_phase() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[(
            "a.py",
            "token = parse_header(raw)\ntoken2 = parse_header(other)\ntoken3 = raw\nparse_header\n",
        )],
    );
    let engine = engine(FakeBackend::default(), dir.path());

    let (_, outcome) = engine.run(&request(&["token"], Strategy::Cascade)).unwrap();

    let derivation = outcome.derivation.as_ref().unwrap();
    assert_eq!(derivation.terms, vec!["parse_header"]);
    assert_eq!(derivation.entries[0].evidence_count, 2);
    assert_eq!(derivation.entries[0].doc_count, 2);
    assert_eq!(outcome.plan.terms.derived, vec!["parse_header"]);

    assert_eq!(outcome.ledger.len(), 2);
    assert_eq!(outcome.ledger[1].probe_id.to_string(), "P2");
    assert_eq!(outcome.ledger[1].phase, 2);
    assert_eq!(outcome.ledger[1].patterns, vec!["parse_header"]);
    assert_eq!(outcome.ledger[1].hit_count, 3);

    // phase-1 and phase-2 hits on the same line are both kept
    assert_eq!(outcome.summary.matches, 6);
    let line_one: Vec<String> = outcome
        .hits
        .iter()
        .filter(|h| h.line == 1)
        .map(|h| h.probe_id.to_string())
        .collect();
    assert_eq!(line_one, vec!["P1", "P2"]);
}

#[test]
fn test_cascade_without_hits_skips_derivation() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("a.py", "hello\n")]);
    let engine = engine(FakeBackend::default(), dir.path());

    let (_, outcome) = engine
        .run(&request(&["nothing_here"], Strategy::Cascade))
        .unwrap();

    assert!(outcome.derivation.is_none());
    assert!(outcome.plan.terms.derived.is_empty());
    assert_eq!(outcome.ledger.len(), 1);
    assert_eq!(outcome.summary.matches, 0);
}

#[test]
fn test_output_cap_keeps_counts_whole() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("a.txt", "x\nx\nx\nx\nx\n")]);
    let engine = engine(FakeBackend::default(), dir.path());

    let mut req = request(&["x"], Strategy::Single);
    req.max_output_hits = 2;
    let (_, outcome) = engine.run(&req).unwrap();

    assert_eq!(outcome.hits.len(), 2);
    assert_eq!(outcome.summary.matches, 5);
    assert!(outcome.summary.truncated);
    assert_eq!(outcome.hits[1].line, 2);
}

#[test]
fn test_zero_matches_suggests_one_widen_axis() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("a.txt", "hello\n")]);
    let engine = engine(FakeBackend::default(), dir.path());

    let (_, outcome) = engine.run(&request(&["absent"], Strategy::Single)).unwrap();
    assert_eq!(outcome.next_step.action, Action::Widen);
    assert_eq!(outcome.next_step.axis, Some(Axis::Mode));

    let mut req = request(&["absent"], Strategy::Single);
    req.include_globs = vec!["**/*.txt".into()];
    let (_, outcome) = engine.run(&req).unwrap();
    assert_eq!(outcome.next_step.axis, Some(Axis::IncludeGlobs));
}

#[test]
fn test_walk_fallback_prunes_canonical_dirs() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("src/main.rs", "fn main() {}\n"),
            (".git/config", "[core]\n"),
            ("node_modules/pkg/index.js", "module.exports = 1\n"),
            ("target/debug/out.txt", "built\n"),
        ],
    );
    let engine = engine(FakeBackend::failing_listing(), dir.path());
    let scope = engine.resolve_scope(".", &[], &[]).unwrap();

    let snapshot = engine.snapshot(&scope, &Default::default(), 20000);

    assert!(!snapshot.listing.ok);
    assert_eq!(snapshot.listing.used_tool, WALK_FALLBACK_TOOL);
    assert_eq!(snapshot.listing.error.as_deref(), Some("listing unavailable"));
    assert_eq!(snapshot.files, vec!["src/main.rs"]);
    assert!(!snapshot.vcs.available);
}

#[test]
fn test_walk_fallback_keeps_star_within_one_directory() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[("src/a.py", ""), ("src/sub/deep.py", ""), ("top.py", ""), ("notes.md", "")],
    );
    let engine = engine(FakeBackend::failing_listing(), dir.path());

    let scope = engine
        .resolve_scope(".", &["src/*.py".to_string()], &[])
        .unwrap();
    assert!(!scope.contains("src/sub/deep.py"));
    let snapshot = engine.snapshot(&scope, &Default::default(), 20000);
    assert_eq!(snapshot.listing.used_tool, WALK_FALLBACK_TOOL);
    assert_eq!(snapshot.files, vec!["src/a.py"]);

    let scope = engine.resolve_scope(".", &["*.py".to_string()], &[]).unwrap();
    let snapshot = engine.snapshot(&scope, &Default::default(), 20000);
    assert_eq!(snapshot.files, vec!["src/a.py", "src/sub/deep.py", "top.py"]);
}

#[test]
fn test_snapshot_is_deterministic() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[("b/two.rs", ""), ("a/one.py", ""), ("a/three.py", ""), ("README", "")],
    );
    let engine = engine(FakeBackend::default(), dir.path());
    let scope = engine.resolve_scope(".", &[], &[]).unwrap();

    let first = engine.snapshot(&scope, &Default::default(), 20000);
    let second = engine.snapshot(&scope, &Default::default(), 20000);

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(first.files, vec!["README", "a/one.py", "a/three.py", "b/two.rs"]);
    match &first.marker {
        Marker::ContentHash { hash } => assert!(hash.starts_with("blake3:")),
        other => panic!("expected content hash, got {other:?}"),
    }
}

#[test]
fn test_snapshot_cap_marks_truncation() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("a", ""), ("b", ""), ("c", "")]);
    let engine = engine(FakeBackend::default(), dir.path());
    let scope = engine.resolve_scope(".", &[], &[]).unwrap();

    let snapshot = engine.snapshot(&scope, &Default::default(), 2);
    assert!(snapshot.truncated);
    assert_eq!(snapshot.files, vec!["a", "b"]);

    let unbounded = engine.snapshot(&scope, &Default::default(), -1);
    assert!(!unbounded.truncated);
    assert_eq!(unbounded.file_count, 3);
}

#[test]
fn test_jsonl_event_order() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("a.py", "token = parse_header(x)\ntoken parse_header\n")]);
    let engine = engine(FakeBackend::default(), dir.path());

    let (prepared, outcome) = engine.run(&request(&["token"], Strategy::Cascade)).unwrap();
    let mut reporter = Reporter::new(Vec::new(), OutputFormat::Jsonl);
    reporter.snapshot(&prepared.snapshot).unwrap();
    reporter.search_plan(&prepared.plan).unwrap();
    reporter.outcome(&outcome).unwrap();

    let text = String::from_utf8(reporter.into_inner()).unwrap();
    let kinds: Vec<String> = text
        .lines()
        .map(|l| {
            let v: Value = serde_json::from_str(l).unwrap();
            v["kind"].as_str().unwrap().to_string()
        })
        .collect();

    let hits = outcome.hits.len();
    let mut expected = vec!["surface_snapshot", "search_plan", "cascade_derivation", "results"];
    expected.extend(std::iter::repeat("hit").take(hits));
    expected.extend(["probe_ledger", "derivation_ledger", "next_step"]);
    assert_eq!(kinds, expected);
}

#[test]
fn test_no_matches_event_replaces_hits() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("a.py", "hello\n")]);
    let engine = engine(FakeBackend::default(), dir.path());

    let (_, outcome) = engine.run(&request(&["absent"], Strategy::Single)).unwrap();
    let mut reporter = Reporter::new(Vec::new(), OutputFormat::Jsonl);
    reporter.outcome(&outcome).unwrap();

    let text = String::from_utf8(reporter.into_inner()).unwrap();
    let kinds: Vec<String> = text
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).unwrap()["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["results", "no_matches", "probe_ledger", "next_step"]);
}
