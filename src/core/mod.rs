//! Core module - Scope, snapshot and the search engine
//!
//! Contains the pipeline orchestrator plus the value types every stage shares.

mod engine;
mod scope;
mod snapshot;
mod vcs;
mod walk;

pub use engine::{GrepEngine, GrepRequest, PreparedSearch, SearchOutcome};
pub use scope::{Scope, ScopeResolver, CANONICAL_EXCLUDES};
pub(crate) use scope::{normalize_rel, to_posix};
pub use snapshot::{
    DirCount, ExtCount, Hotspot, Listing, Marker, SnapshotBuilder, SurfaceSnapshot, VcsInfo,
    LISTING_TOOL, WALK_FALLBACK_TOOL,
};
pub use vcs::{find_repo_root, GitProbe};
pub use walk::{walk_files, PRUNED_DIR_NAMES};

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::GrapeError;

/// How patterns are interpreted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Literal strings (`-F`)
    #[default]
    Fixed,
    /// Regular expressions
    Regex,
}

/// Case sensitivity of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    Sensitive,
    Insensitive,
    /// Insensitive unless the pattern contains an uppercase letter (`-S`)
    #[default]
    Smart,
}

/// Probe partitioning strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One probe with every pattern
    #[default]
    Single,
    /// Patterns bucketed into concurrent probes
    Parallel,
    /// Phase-1 probe, then a phase-2 probe on derived terms
    Cascade,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Fixed => "fixed",
            MatchMode::Regex => "regex",
        }
    }
}

impl CaseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseMode::Sensitive => "sensitive",
            CaseMode::Insensitive => "insensitive",
            CaseMode::Smart => "smart",
        }
    }
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Single => "single",
            Strategy::Parallel => "parallel",
            Strategy::Cascade => "cascade",
        }
    }
}

impl FromStr for MatchMode {
    type Err = GrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(MatchMode::Fixed),
            "regex" => Ok(MatchMode::Regex),
            other => Err(GrapeError::usage(format!("unknown match mode '{other}'"))),
        }
    }
}

impl FromStr for CaseMode {
    type Err = GrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sensitive" => Ok(CaseMode::Sensitive),
            "insensitive" => Ok(CaseMode::Insensitive),
            "smart" => Ok(CaseMode::Smart),
            other => Err(GrapeError::usage(format!("unknown case mode '{other}'"))),
        }
    }
}

impl FromStr for Strategy {
    type Err = GrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Strategy::Single),
            "parallel" => Ok(Strategy::Parallel),
            "cascade" => Ok(Strategy::Cascade),
            other => Err(GrapeError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traversal policy shared by the listing and every probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Honor .gitignore/.ignore/.rgignore files
    pub respect_ignore_files: bool,
    /// Honor VCS ignore files specifically
    pub respect_vcs_ignore: bool,
    /// Honor the global git excludes file
    pub respect_global_ignore: bool,
    /// Descend into hidden files and directories
    pub search_hidden: bool,
    /// Follow symbolic links
    pub follow_symlinks: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            respect_ignore_files: true,
            respect_vcs_ignore: true,
            respect_global_ignore: true,
            search_hidden: false,
            follow_symlinks: false,
        }
    }
}

impl Policy {
    /// Build a policy from command-line style flags.
    ///
    /// `no_ignore` switches off every ignore source; the vcs/global flags only
    /// switch off their own.
    pub fn from_flags(
        hidden: bool,
        follow: bool,
        no_ignore: bool,
        no_ignore_vcs: bool,
        no_ignore_global: bool,
    ) -> Self {
        Self {
            respect_ignore_files: !no_ignore,
            respect_vcs_ignore: !(no_ignore || no_ignore_vcs),
            respect_global_ignore: !(no_ignore || no_ignore_global),
            search_hidden: hidden,
            follow_symlinks: follow,
        }
    }

    /// Engine flags that enforce this policy; `--no-ignore` alone covers the
    /// vcs and global sources
    pub fn engine_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.search_hidden {
            flags.push("--hidden");
        }
        if self.follow_symlinks {
            flags.push("--follow");
        }
        if !self.respect_ignore_files {
            flags.push("--no-ignore");
            return flags;
        }
        if !self.respect_vcs_ignore {
            flags.push("--no-ignore-vcs");
        }
        if !self.respect_global_ignore {
            flags.push("--no-ignore-global");
        }
        flags
    }
}

/// Matching knobs passed to every probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    pub mode: MatchMode,
    pub case: CaseMode,
    /// Context lines around each match (0..=10)
    pub context: u32,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            mode: MatchMode::Fixed,
            case: CaseMode::Smart,
            context: 0,
        }
    }
}

/// Root as given by the caller and as displayed in every report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootRef {
    pub input: String,
    pub resolved: String,
}

/// Convert a signed bound into a cap; negative values mean unbounded
pub fn bound_cap(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ignore_implies_vcs_and_global() {
        let policy = Policy::from_flags(false, false, true, false, false);
        assert!(!policy.respect_ignore_files);
        assert!(!policy.respect_vcs_ignore);
        assert!(!policy.respect_global_ignore);
        assert_eq!(policy.engine_flags(), vec!["--no-ignore"]);

        let all = Policy::from_flags(false, true, true, true, true);
        assert_eq!(all.engine_flags(), vec!["--follow", "--no-ignore"]);
    }

    #[test]
    fn test_vcs_flag_is_independent() {
        let policy = Policy::from_flags(true, false, false, true, false);
        assert!(policy.respect_ignore_files);
        assert!(!policy.respect_vcs_ignore);
        assert!(policy.respect_global_ignore);
        assert_eq!(policy.engine_flags(), vec!["--hidden", "--no-ignore-vcs"]);
    }

    #[test]
    fn test_unknown_strategy_is_usage_error() {
        let err = "fanout".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, GrapeError::UnknownStrategy(ref s) if s == "fanout"));
        assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
    }

    #[test]
    fn test_bound_cap() {
        assert_eq!(bound_cap(5), Some(5));
        assert_eq!(bound_cap(0), Some(0));
        assert_eq!(bound_cap(-1), None);
    }
}
