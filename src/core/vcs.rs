//! Version control metadata for snapshot markers and change hotspots

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Find the nearest ancestor (inclusive) containing a `.git` entry
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Thin wrapper over the git binary
#[derive(Debug, Clone)]
pub struct GitProbe {
    binary: String,
}

impl Default for GitProbe {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Whether the git binary can be executed at all
    pub fn is_installed(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Current revision and working-tree dirtiness; either may be unknown
    pub fn head_and_dirty(&self, repo_root: &Path) -> (Option<String>, Option<bool>) {
        let head = self
            .run(repo_root, &["rev-parse", "HEAD"])
            .map(|out| out.trim().to_string())
            .filter(|h| !h.is_empty());

        let dirty = self
            .run(repo_root, &["status", "--porcelain"])
            .map(|out| !out.trim().is_empty());

        (head, dirty)
    }

    /// Repository-relative paths touched by the most recent commits
    pub fn recent_paths(&self, repo_root: &Path, max_commits: usize, max_paths: usize) -> Vec<String> {
        let commits = format!("-n{max_commits}");
        let Some(out) = self.run(repo_root, &["log", &commits, "--name-only", "--pretty=format:"])
        else {
            return Vec::new();
        };

        out.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(max_paths)
            .map(str::to_string)
            .collect()
    }

    fn run(&self, repo_root: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new(&self.binary)
            .arg("-C")
            .arg(repo_root)
            .args(args)
            .output()
            .map_err(|e| debug!("git {:?} failed to start: {}", args, e))
            .ok()?;

        if !output.status.success() {
            debug!("git {:?} exited with {}", args, output.status);
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
