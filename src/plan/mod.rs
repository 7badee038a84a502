//! Plans - the reproducible description of what a run will do
//!
//! - `SearchPlan`: compiled per `grep` run, immutable apart from derived terms
//! - `SurfacePlan`: the smaller plan reported by `scan`
//! - `compiled`: validation of externally supplied compiled plans

pub mod compiled;

pub use compiled::{
    canonical_json, intent_hash, validate, CompiledPlan, GrepSection, COMPILED_PLAN_SCHEMA,
    INTENT_SCHEMA,
};

use serde::{Deserialize, Serialize};

use crate::core::{MatchOptions, Policy, RootRef, Scope, Strategy, CANONICAL_EXCLUDES};
use crate::report::OutputFormat;

pub const SEARCH_PLAN_SCHEMA: &str = "search_plan_v1";
pub const SURFACE_PLAN_SCHEMA: &str = "grape_surface_plan_v1";
/// Structured output format requested from the engine
pub const ENGINE_FORMAT: &str = "rg_json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanScope {
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub canonical_excludes: &'static [&'static str],
}

impl From<&Scope> for PlanScope {
    fn from(scope: &Scope) -> Self {
        Self {
            include_globs: scope.include_globs.clone(),
            exclude_globs: scope.exclude_globs.clone(),
            canonical_excludes: CANONICAL_EXCLUDES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Terms {
    pub base: Vec<String>,
    /// Filled in only after a cascade derivation
    pub derived: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    /// Negative means unbounded
    pub max_output_hits: i64,
    pub max_probes: usize,
    /// Negative means unbounded
    pub max_derived: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub tool: String,
    pub format: &'static str,
}

/// How stdout will be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputInfo {
    pub format_requested: OutputFormat,
    pub format_resolved: OutputFormat,
    pub stdout_isatty: bool,
}

impl OutputInfo {
    /// Resolve `auto` against whether stdout is a terminal
    pub fn resolve(requested: OutputFormat, stdout_isatty: bool) -> Self {
        Self {
            format_requested: requested,
            format_resolved: requested.resolve(stdout_isatty),
            stdout_isatty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPlan {
    pub schema: &'static str,
    pub root: RootRef,
    pub scope: PlanScope,
    pub policy: Policy,
    #[serde(rename = "match")]
    pub matching: MatchOptions,
    pub terms: Terms,
    pub strategy: Strategy,
    pub bounds: Bounds,
    pub engine: EngineInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputInfo>,
}

impl SearchPlan {
    pub fn new(
        scope: &Scope,
        policy: Policy,
        matching: MatchOptions,
        base_terms: Vec<String>,
        strategy: Strategy,
        bounds: Bounds,
        tool: &str,
    ) -> Self {
        Self {
            schema: SEARCH_PLAN_SCHEMA,
            root: scope.root.clone(),
            scope: PlanScope::from(scope),
            policy,
            matching,
            terms: Terms {
                base: base_terms,
                derived: Vec::new(),
            },
            strategy,
            bounds,
            engine: EngineInfo {
                tool: tool.to_string(),
                format: ENGINE_FORMAT,
            },
            output: None,
        }
    }

    pub fn with_output(mut self, output: OutputInfo) -> Self {
        self.output = Some(output);
        self
    }
}

// ============================================================================
// Policy flags (CLI / compiled-plan shape)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreFlags {
    pub no_ignore: bool,
    pub no_ignore_vcs: bool,
    pub no_ignore_global: bool,
}

/// Traversal flags as the user spells them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFlags {
    pub hidden: bool,
    pub follow: bool,
    pub ignore: IgnoreFlags,
}

impl PolicyFlags {
    pub fn to_policy(self) -> Policy {
        Policy::from_flags(
            self.hidden,
            self.follow,
            self.ignore.no_ignore,
            self.ignore.no_ignore_vcs,
            self.ignore.no_ignore_global,
        )
    }
}

/// Plan reported by `scan`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfacePlan {
    pub schema: &'static str,
    pub root: String,
    pub include_globs: Vec<String>,
    /// User excludes only; canonical ones are reported by the snapshot
    pub exclude_globs: Vec<String>,
    pub snapshot_max_files: i64,
    pub policy: PolicyFlags,
    pub output: OutputInfo,
}

impl SurfacePlan {
    pub fn new(
        root: &str,
        include_globs: &[String],
        exclude_globs: &[String],
        snapshot_max_files: i64,
        policy: PolicyFlags,
        output: OutputInfo,
    ) -> Self {
        Self {
            schema: SURFACE_PLAN_SCHEMA,
            root: root.to_string(),
            include_globs: include_globs.to_vec(),
            exclude_globs: exclude_globs.to_vec(),
            snapshot_max_files,
            policy,
            output,
        }
    }
}
