//! Fallback walker - recursive listing used when the engine cannot list files
//!
//! Prunes the canonical directory names while descending, so excluded trees
//! are never entered.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use super::scope::{to_posix, Scope};

/// Directory names pruned during the fallback walk
pub const PRUNED_DIR_NAMES: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "target",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".idea",
    ".vscode",
];

/// List every in-scope regular file under the scope root, sorted.
///
/// Unreadable entries are skipped; the walk never fails as a whole.
pub fn walk_files(scope: &Scope, follow_symlinks: bool) -> Vec<String> {
    let root = scope.root_path.as_path();

    let mut collected: Vec<String> = WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_pruned(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| relative(e.path(), root))
        .filter(|rel| scope.contains(rel))
        .collect();

    collected.sort();
    collected
}

fn is_pruned(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| PRUNED_DIR_NAMES.contains(&name))
            .unwrap_or(false)
}

fn relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(to_posix)
}
