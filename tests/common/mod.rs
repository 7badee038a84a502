//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use grape::core::{
    walk_files, GitProbe, GrepEngine, GrepRequest, MatchOptions, Policy, Scope, Strategy,
};
use grape::probe::{BackendError, ProbeContext, RawHit, SearchBackend, SearchOutput, SearchRequest};

/// In-process backend: case-sensitive substring matching over the walked scope
#[derive(Debug, Default)]
pub struct FakeBackend {
    /// Listing fails, forcing the walk fallback
    pub listing_fails: bool,
    /// Any probe containing one of these patterns fails
    pub fail_on: Vec<String>,
}

impl FakeBackend {
    pub fn failing_listing() -> Self {
        Self {
            listing_fails: true,
            ..Self::default()
        }
    }

    pub fn failing_on(patterns: &[&str]) -> Self {
        Self {
            fail_on: patterns.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl SearchBackend for FakeBackend {
    fn tool(&self) -> &str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn list_files(&self, scope: &Scope, policy: &Policy) -> Result<Vec<String>, BackendError> {
        if self.listing_fails {
            return Err(BackendError::Status("listing unavailable".into()));
        }
        Ok(walk_files(scope, policy.follow_symlinks))
    }

    fn probe_argv(&self, patterns: &[String], _context: &ProbeContext) -> Vec<String> {
        let mut argv = vec!["fake".to_string()];
        for pattern in patterns {
            argv.push("-e".to_string());
            argv.push(pattern.clone());
        }
        argv
    }

    fn search(&self, request: SearchRequest<'_>) -> Result<SearchOutput, BackendError> {
        if let Some(bad) = request
            .patterns
            .iter()
            .find(|p| self.fail_on.contains(p))
        {
            return Err(BackendError::Status(format!("fake refused {bad}")));
        }

        let scope = &request.context.scope;
        let files = walk_files(scope, request.context.policy.follow_symlinks);
        let mut hits = Vec::new();
        let mut with_match = 0;
        for rel in &files {
            let Ok(text) = fs::read_to_string(scope.root_path.join(rel)) else {
                continue;
            };
            let before = hits.len();
            for (idx, line) in text.lines().enumerate() {
                if request.patterns.iter().any(|p| line.contains(p.as_str())) {
                    hits.push(RawHit {
                        path: rel.clone(),
                        line: idx as u64 + 1,
                        snippet: line.to_string(),
                    });
                }
            }
            if hits.len() > before {
                with_match += 1;
            }
        }

        Ok(SearchOutput {
            hits,
            files_searched: Some(files.len() as u64),
            files_with_match: Some(with_match),
        })
    }
}

/// Write `files` (relative path, content) under `root`
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Engine over `root` with git disabled
pub fn engine(backend: FakeBackend, root: &Path) -> GrepEngine {
    GrepEngine::new(Arc::new(backend), root).with_git(GitProbe::new("grape-test-no-git"))
}

pub fn request(patterns: &[&str], strategy: Strategy) -> GrepRequest {
    GrepRequest {
        root: ".".into(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        include_globs: vec![],
        exclude_globs: vec![],
        matching: MatchOptions::default(),
        strategy,
        max_output_hits: 500,
        max_probes: 8,
        max_derived: 12,
        snapshot_max_files: 20000,
        policy: Policy::default(),
    }
}
