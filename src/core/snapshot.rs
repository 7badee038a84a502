//! Surface snapshot - bounded, deterministic view of the searchable files
//!
//! Lists files through the search backend, falls back to a recursive walk
//! when the backend cannot list, then summarises the listing.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::scope::{normalize_rel, to_posix, Scope, CANONICAL_EXCLUDES};
use super::vcs::{find_repo_root, GitProbe};
use super::walk::walk_files;
use super::{bound_cap, Policy, RootRef};
use crate::probe::SearchBackend;

pub const SNAPSHOT_SCHEMA: &str = "surface_snapshot_v1";
/// Listing mechanism requested from the backend
pub const LISTING_TOOL: &str = "rg --files";
/// Reported when the recursive walk replaced the backend listing
pub const WALK_FALLBACK_TOOL: &str = "walk_fallback";

const TOP_EXTENSIONS: usize = 10;
const TOP_DIRS: usize = 15;
const TOP_HOTSPOTS: usize = 10;
const NO_EXTENSION: &str = "<none>";

/// Summary of the in-scope file set
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSnapshot {
    pub schema: &'static str,
    pub root: RootRef,
    pub scope: SnapshotScope,
    pub listing: Listing,
    pub vcs: VcsInfo,
    pub marker: Marker,
    pub file_count: usize,
    pub truncated: bool,
    pub dominant_extensions: Vec<ExtCount>,
    pub top_level_dirs: Vec<DirCount>,
    pub recent_change_hotspots: Option<Vec<Hotspot>>,
    /// The (possibly truncated) sorted listing itself
    #[serde(skip)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotScope {
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub canonical_excludes: &'static [&'static str],
    pub snapshot_max_files: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub requested_tool: String,
    pub used_tool: String,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VcsInfo {
    pub available: bool,
    pub used: bool,
}

/// Reproducible identity of the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Marker {
    Vcs { head: String, dirty: Option<bool> },
    ContentHash { hash: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtCount {
    pub ext: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirCount {
    pub dir: String,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hotspot {
    pub dir: String,
    pub touched_files: usize,
}

/// Builds snapshots from a backend and an optional git binary
pub struct SnapshotBuilder<'a> {
    backend: &'a dyn SearchBackend,
    git: &'a GitProbe,
    hotspot_commits: usize,
    hotspot_max_paths: usize,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(backend: &'a dyn SearchBackend, git: &'a GitProbe) -> Self {
        Self {
            backend,
            git,
            hotspot_commits: 30,
            hotspot_max_paths: 2000,
        }
    }

    pub fn with_hotspot_window(mut self, commits: usize, max_paths: usize) -> Self {
        self.hotspot_commits = commits;
        self.hotspot_max_paths = max_paths;
        self
    }

    /// Build the snapshot; negative `max_files` means no cap
    pub fn build(&self, scope: &Scope, policy: &Policy, max_files: i64) -> SurfaceSnapshot {
        let (mut files, listing) = match self.backend.list_files(scope, policy) {
            Ok(files) => (
                files,
                Listing {
                    requested_tool: LISTING_TOOL.to_string(),
                    used_tool: LISTING_TOOL.to_string(),
                    ok: true,
                    error: None,
                },
            ),
            Err(e) => {
                warn!("File listing failed ({}), walking {} instead", e, scope.root_path.display());
                (
                    walk_files(scope, policy.follow_symlinks),
                    Listing {
                        requested_tool: LISTING_TOOL.to_string(),
                        used_tool: WALK_FALLBACK_TOOL.to_string(),
                        ok: false,
                        error: Some(e.to_string()),
                    },
                )
            }
        };

        files.sort();
        let mut truncated = false;
        if let Some(cap) = bound_cap(max_files) {
            if files.len() > cap {
                files.truncate(cap);
                truncated = true;
            }
        }
        info!("Snapshot: {} files (truncated={})", files.len(), truncated);

        let repo_root = find_repo_root(&scope.root_path);
        let vcs_available = repo_root.is_some() && self.git.is_installed();
        debug!("VCS available: {} ({:?})", vcs_available, repo_root);

        let head = match (&repo_root, vcs_available) {
            (Some(repo), true) => Some(self.git.head_and_dirty(repo)),
            _ => None,
        };
        let marker = match head {
            Some((Some(head), dirty)) => Marker::Vcs { head, dirty },
            _ => content_marker(&files),
        };

        let recent_change_hotspots = match (&repo_root, vcs_available) {
            (Some(repo), true) => Some(self.hotspots(repo, scope)),
            _ => None,
        };

        SurfaceSnapshot {
            schema: SNAPSHOT_SCHEMA,
            root: scope.root.clone(),
            scope: SnapshotScope {
                include_globs: scope.include_globs.clone(),
                exclude_globs: scope.exclude_globs.clone(),
                canonical_excludes: CANONICAL_EXCLUDES,
                snapshot_max_files: max_files,
            },
            listing,
            vcs: VcsInfo {
                available: vcs_available,
                used: vcs_available,
            },
            marker,
            file_count: files.len(),
            truncated,
            dominant_extensions: extension_histogram(&files),
            top_level_dirs: dir_histogram(&files),
            recent_change_hotspots,
            files,
        }
    }

    fn hotspots(&self, repo_root: &Path, scope: &Scope) -> Vec<Hotspot> {
        let recent = self
            .git
            .recent_paths(repo_root, self.hotspot_commits, self.hotspot_max_paths);
        hotspot_histogram(&recent, repo_root, scope)
    }
}

/// Content hash of the sorted listing
pub fn content_marker(files: &[String]) -> Marker {
    let hash = blake3::hash(files.join("\n").as_bytes());
    Marker::ContentHash {
        hash: format!("blake3:{}", hash.to_hex()),
    }
}

pub(crate) fn extension_histogram(files: &[String]) -> Vec<ExtCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for rel in files {
        *counts.entry(extension_key(rel)).or_default() += 1;
    }
    ranked(counts, TOP_EXTENSIONS)
        .into_iter()
        .map(|(ext, count)| ExtCount { ext, count })
        .collect()
}

pub(crate) fn dir_histogram(files: &[String]) -> Vec<DirCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for rel in files {
        *counts.entry(top_segment(rel).to_string()).or_default() += 1;
    }
    ranked(counts, TOP_DIRS)
        .into_iter()
        .map(|(dir, file_count)| DirCount { dir, file_count })
        .collect()
}

fn hotspot_histogram(recent: &[String], repo_root: &Path, scope: &Scope) -> Vec<Hotspot> {
    let root_rel = scope
        .root_path
        .strip_prefix(repo_root)
        .map(to_posix)
        .unwrap_or_default();
    let root_rel = root_rel.trim_end_matches('/');

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for path in recent {
        let rel = if root_rel.is_empty() {
            path.as_str()
        } else if let Some(rest) = path.strip_prefix(root_rel) {
            match rest.strip_prefix('/') {
                Some(rest) => rest,
                None if rest.is_empty() => rest,
                None => continue,
            }
        } else {
            continue;
        };
        if rel.is_empty() || rel.ends_with('/') || !scope.contains(rel) {
            continue;
        }
        *counts.entry(top_segment(rel).to_string()).or_default() += 1;
    }

    ranked(counts, TOP_HOTSPOTS)
        .into_iter()
        .map(|(dir, touched_files)| Hotspot { dir, touched_files })
        .collect()
}

/// Count-descending, then name-ascending, truncated to `limit`
fn ranked(counts: BTreeMap<String, usize>, limit: usize) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
}

fn extension_key(rel: &str) -> String {
    Path::new(rel)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{e}"))
        .unwrap_or_else(|| NO_EXTENSION.to_string())
}

fn top_segment(rel: &str) -> &str {
    let rel = normalize_rel(rel);
    match rel.split_once('/') {
        Some((top, _)) => top,
        None => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extension_histogram_ranks_and_lowercases() {
        let hist = extension_histogram(&files(&[
            "a.PY", "b.py", "c.rs", "Makefile", "d.md", "e.rs", "f.py",
        ]));
        assert_eq!(
            hist[0],
            ExtCount {
                ext: ".py".into(),
                count: 3
            }
        );
        assert_eq!(hist[1].ext, ".rs");
        // ties broken alphabetically: ".md" < "<none>"
        assert_eq!(hist[2].ext, ".md");
        assert_eq!(hist[3].ext, NO_EXTENSION);
    }

    #[test]
    fn test_dir_histogram_uses_dot_for_root_files() {
        let hist = dir_histogram(&files(&["README.md", "src/a.rs", "src/b.rs", "docs/x.md"]));
        assert_eq!(
            hist,
            vec![
                DirCount {
                    dir: "src".into(),
                    file_count: 2
                },
                DirCount {
                    dir: ".".into(),
                    file_count: 1
                },
                DirCount {
                    dir: "docs".into(),
                    file_count: 1
                },
            ]
        );
    }

    #[test]
    fn test_histogram_caps() {
        let many: Vec<String> = (0..40).map(|i| format!("d{i:02}/f.e{i:02}")).collect();
        assert_eq!(extension_histogram(&many).len(), TOP_EXTENSIONS);
        assert_eq!(dir_histogram(&many).len(), TOP_DIRS);
    }

    #[test]
    fn test_content_marker_depends_only_on_listing() {
        let a = content_marker(&files(&["a.py", "b.py"]));
        let b = content_marker(&files(&["a.py", "b.py"]));
        let c = content_marker(&files(&["a.py"]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        match a {
            Marker::ContentHash { hash } => assert!(hash.starts_with("blake3:")),
            other => panic!("unexpected marker {other:?}"),
        }
    }

    #[test]
    fn test_hotspots_restricted_to_scope_root() {
        let root = RootRef {
            input: "svc".into(),
            resolved: "svc".into(),
        };
        let scope = Scope::new(root, Path::new("/repo/svc").to_path_buf(), vec![], &[]).unwrap();
        let recent = files(&[
            "svc/api/a.rs",
            "svc/api/b.rs",
            "svc/main.rs",
            "other/x.rs",
            "svc/node_modules/z.js",
            "svcx/y.rs",
        ]);
        let hist = hotspot_histogram(&recent, Path::new("/repo"), &scope);
        assert_eq!(
            hist,
            vec![
                Hotspot {
                    dir: "api".into(),
                    touched_files: 2
                },
                Hotspot {
                    dir: ".".into(),
                    touched_files: 1
                },
            ]
        );
    }
}
