//! Snapshot markers and hotspots over a real git repository; skipped without git

mod common;

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use common::{write_tree, FakeBackend};
use grape::core::{GitProbe, GrepEngine, Marker};
use tempfile::tempdir;

fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args([
            "-c",
            "user.name=grape",
            "-c",
            "user.email=grape@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {args:?} failed");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Committed repository with a `svc` sub-root, or `None` when git is missing
fn committed_repo(root: &Path) -> Option<()> {
    if !GitProbe::default().is_installed() {
        eprintln!("git not installed, skipping");
        return None;
    }
    write_tree(
        root,
        &[
            ("svc/main.py", "main\n"),
            ("svc/api/handler.py", "handler\n"),
            ("docs/readme.md", "docs\n"),
        ],
    );
    git(root, &["init", "-q"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "initial"]);
    Some(())
}

#[test]
fn test_clean_repo_uses_vcs_marker() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    if committed_repo(&root).is_none() {
        return;
    }
    let engine = GrepEngine::new(Arc::new(FakeBackend::default()), &root);
    let scope = engine.resolve_scope("svc", &[], &[]).unwrap();

    let snapshot = engine.snapshot(&scope, &Default::default(), 20000);

    assert!(snapshot.vcs.available);
    assert!(snapshot.vcs.used);
    let head = git(&root, &["rev-parse", "HEAD"]);
    match &snapshot.marker {
        Marker::Vcs { head: got, dirty } => {
            assert_eq!(got, &head);
            assert_eq!(*dirty, Some(false));
        }
        other => panic!("expected vcs marker, got {other:?}"),
    }
    let marker = serde_json::to_value(&snapshot.marker).unwrap();
    assert_eq!(marker["kind"], "vcs");
    assert_eq!(marker["dirty"], false);
}

#[test]
fn test_hotspots_stay_inside_the_sub_root() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    if committed_repo(&root).is_none() {
        return;
    }
    let engine = GrepEngine::new(Arc::new(FakeBackend::default()), &root);
    let scope = engine.resolve_scope("svc", &[], &[]).unwrap();

    let snapshot = engine.snapshot(&scope, &Default::default(), 20000);

    assert_eq!(snapshot.files, vec!["api/handler.py", "main.py"]);
    let hotspots: Vec<(String, usize)> = snapshot
        .recent_change_hotspots
        .unwrap()
        .into_iter()
        .map(|h| (h.dir, h.touched_files))
        .collect();
    assert_eq!(hotspots, vec![(".".to_string(), 1), ("api".to_string(), 1)]);
}

#[test]
fn test_uncommitted_change_marks_dirty() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    if committed_repo(&root).is_none() {
        return;
    }
    std::fs::write(root.join("svc/main.py"), "edited\n").unwrap();
    let engine = GrepEngine::new(Arc::new(FakeBackend::default()), &root);
    let scope = engine.resolve_scope(".", &[], &[]).unwrap();

    let snapshot = engine.snapshot(&scope, &Default::default(), 20000);

    assert!(matches!(
        snapshot.marker,
        Marker::Vcs {
            dirty: Some(true),
            ..
        }
    ));
}
