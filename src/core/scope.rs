//! Scope resolution - root path plus include/exclude glob sets
//!
//! Exclusion always wins over inclusion, and the canonical excludes are
//! present no matter what the caller passes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::debug;

use super::RootRef;
use crate::error::{GrapeError, Result};

/// VCS metadata, dependency, build and cache directories, excluded at any depth
pub const CANONICAL_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/target/**",
    "**/.venv/**",
    "**/venv/**",
    "**/__pycache__/**",
    "**/.pytest_cache/**",
    "**/.mypy_cache/**",
    "**/.ruff_cache/**",
    "**/.idea/**",
    "**/.vscode/**",
];

/// Resolves roots against an explicit base directory
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    base: PathBuf,
}

impl ScopeResolver {
    /// Create a resolver; relative roots are resolved against `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let base = base.canonicalize().unwrap_or(base);
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve a root input to an absolute, existing directory
    pub fn resolve_root(&self, input: &str) -> Result<PathBuf> {
        let raw = Path::new(input);
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.base.join(raw)
        };

        let resolved = joined
            .canonicalize()
            .map_err(|_| GrapeError::InvalidRoot(joined.clone()))?;
        if !resolved.is_dir() {
            return Err(GrapeError::InvalidRoot(resolved));
        }
        Ok(resolved)
    }

    /// Display form of a path: relative to the base, `.` for the base itself
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.base) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => to_posix(rel),
            Err(_) => to_posix(path),
        }
    }

    /// Build the effective scope for a search
    pub fn resolve(
        &self,
        root_input: &str,
        include_globs: &[String],
        user_excludes: &[String],
    ) -> Result<Scope> {
        let root_path = self.resolve_root(root_input)?;
        let root = RootRef {
            input: root_input.to_string(),
            resolved: self.display_path(&root_path),
        };
        debug!("Resolved root {} -> {}", root_input, root_path.display());
        Scope::new(root, root_path, include_globs.to_vec(), user_excludes)
    }
}

/// The resolved root plus the globs that define eligible files
#[derive(Debug, Clone)]
pub struct Scope {
    pub root: RootRef,
    /// Absolute root directory; passed explicitly to every stage
    pub root_path: PathBuf,
    pub include_globs: Vec<String>,
    /// Sorted, deduplicated union of user and canonical excludes
    pub exclude_globs: Vec<String>,
    include_set: Option<GlobSet>,
    exclude_set: GlobSet,
}

impl Scope {
    pub fn new(
        root: RootRef,
        root_path: PathBuf,
        include_globs: Vec<String>,
        user_excludes: &[String],
    ) -> Result<Self> {
        let exclude_globs: Vec<String> = CANONICAL_EXCLUDES
            .iter()
            .map(|g| g.to_string())
            .chain(user_excludes.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let include_set = if include_globs.is_empty() {
            None
        } else {
            Some(build_set(&include_globs)?)
        };
        let exclude_set = build_set(&exclude_globs)?;

        Ok(Self {
            root,
            root_path,
            include_globs,
            exclude_globs,
            include_set,
            exclude_set,
        })
    }

    /// Whether a root-relative path is eligible
    pub fn contains(&self, rel_path: &str) -> bool {
        let rel = normalize_rel(rel_path);
        if self.exclude_set.is_match(rel) {
            return false;
        }
        match &self.include_set {
            Some(set) => set.is_match(rel),
            None => true,
        }
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Scope", 3)?;
        state.serialize_field("include_globs", &self.include_globs)?;
        state.serialize_field("exclude_globs", &self.exclude_globs)?;
        state.serialize_field("canonical_excludes", CANONICAL_EXCLUDES)?;
        state.end()
    }
}

fn build_set(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for raw in globs {
        builder.add(compile_glob(raw)?);
    }
    builder.build().map_err(|e| GrapeError::InvalidGlob {
        glob: globs.join(", "),
        message: e.to_string(),
    })
}

/// `*` stops at `/`; a glob without any `/` matches at every depth
fn compile_glob(raw: &str) -> Result<Glob> {
    let rel = normalize_rel(raw);
    let pattern = if rel.contains('/') {
        rel.to_string()
    } else {
        format!("**/{rel}")
    };
    GlobBuilder::new(&pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| GrapeError::InvalidGlob {
            glob: raw.to_string(),
            message: e.to_string(),
        })
}

/// Strip a leading `./`
pub(crate) fn normalize_rel(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

/// Forward-slash form of a path
pub(crate) fn to_posix(path: &Path) -> String {
    let text = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '\\' {
        text.replace('\\', "/")
    } else {
        text.into_owned()
    }
}
