//! GrepEngine - orchestrates scope, snapshot, probes, derivation and results
//!
//! `prepare` does everything that does not search content (scope, snapshot,
//! plan); `execute` runs the probes for a prepared search. Callers that
//! stream output emit the snapshot and plan between the two.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::scope::{Scope, ScopeResolver};
use super::snapshot::{SnapshotBuilder, SurfaceSnapshot};
use super::vcs::GitProbe;
use super::{bound_cap, MatchOptions, Policy, Strategy};
use crate::advisor::{suggest, NextStepSuggestion};
use crate::aggregate::{aggregate, ResultsSummary};
use crate::config::Config;
use crate::derive::{derive_terms, Derivation};
use crate::error::{GrapeError, Result};
use crate::plan::{Bounds, SearchPlan};
use crate::probe::scheduler::{phase_one, run_probes};
use crate::probe::{
    Hit, ProbeContext, ProbeLedgerEntry, ProbeRunner, ProbeSpec, RipgrepBackend, SearchBackend,
    PHASE_DERIVED,
};

/// Everything needed to run one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepRequest {
    pub root: String,
    pub patterns: Vec<String>,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub matching: MatchOptions,
    pub strategy: Strategy,
    /// Negative means unbounded
    pub max_output_hits: i64,
    pub max_probes: usize,
    /// Negative means unbounded
    pub max_derived: i64,
    /// Negative means unbounded
    pub snapshot_max_files: i64,
    pub policy: Policy,
}

impl GrepRequest {
    pub fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() {
            return Err(GrapeError::usage("at least one --pattern is required"));
        }
        if self.max_probes == 0 {
            return Err(GrapeError::usage("--max-probes must be >= 1"));
        }
        if self.matching.context > 10 {
            return Err(GrapeError::usage("--context must be between 0 and 10"));
        }
        Ok(())
    }
}

/// Scope, snapshot and plan of a search that has not probed yet
#[derive(Debug, Clone)]
pub struct PreparedSearch {
    pub scope: Scope,
    pub snapshot: SurfaceSnapshot,
    pub plan: SearchPlan,
}

/// Result of executing a prepared search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The plan with derived terms filled in
    pub plan: SearchPlan,
    /// Present for cascade runs whose first phase found hits
    pub derivation: Option<Derivation>,
    pub summary: ResultsSummary,
    /// Hits to emit, canonical order, truncated
    pub hits: Vec<Hit>,
    /// One entry per executed probe, ascending id
    pub ledger: Vec<ProbeLedgerEntry>,
    pub next_step: NextStepSuggestion,
}

/// The search orchestrator
pub struct GrepEngine {
    backend: Arc<dyn SearchBackend>,
    git: GitProbe,
    resolver: ScopeResolver,
    hotspot_commits: usize,
    hotspot_max_paths: usize,
}

impl GrepEngine {
    /// Create an engine; relative roots resolve against `base`
    pub fn new(backend: Arc<dyn SearchBackend>, base: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            git: GitProbe::default(),
            resolver: ScopeResolver::new(base),
            hotspot_commits: 30,
            hotspot_max_paths: 2000,
        }
    }

    /// Ripgrep and git binaries plus the hotspot window from config
    pub fn from_config(config: &Config, base: impl Into<PathBuf>) -> Self {
        let backend = Arc::new(RipgrepBackend::new(config.engine.binary.clone()));
        Self::new(backend, base)
            .with_git(GitProbe::new(config.engine.git_binary.clone()))
            .with_hotspot_window(config.engine.hotspot_commits, config.engine.hotspot_max_paths)
    }

    pub fn with_git(mut self, git: GitProbe) -> Self {
        self.git = git;
        self
    }

    pub fn with_hotspot_window(mut self, commits: usize, max_paths: usize) -> Self {
        self.hotspot_commits = commits;
        self.hotspot_max_paths = max_paths;
        self
    }

    pub fn backend(&self) -> &dyn SearchBackend {
        self.backend.as_ref()
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    pub fn resolve_scope(
        &self,
        root: &str,
        include_globs: &[String],
        exclude_globs: &[String],
    ) -> Result<Scope> {
        self.resolver.resolve(root, include_globs, exclude_globs)
    }

    /// Bounded snapshot of a resolved scope
    pub fn snapshot(&self, scope: &Scope, policy: &Policy, max_files: i64) -> SurfaceSnapshot {
        SnapshotBuilder::new(self.backend.as_ref(), &self.git)
            .with_hotspot_window(self.hotspot_commits, self.hotspot_max_paths)
            .build(scope, policy, max_files)
    }

    /// Compile the search plan for a request over a resolved scope
    pub fn compile(&self, request: &GrepRequest, scope: &Scope) -> SearchPlan {
        SearchPlan::new(
            scope,
            request.policy,
            request.matching,
            request.patterns.clone(),
            request.strategy,
            Bounds {
                max_output_hits: request.max_output_hits,
                max_probes: request.max_probes,
                max_derived: request.max_derived,
            },
            self.backend.tool(),
        )
    }

    /// Validate, resolve, snapshot and compile
    pub fn prepare(&self, request: &GrepRequest) -> Result<PreparedSearch> {
        request.validate()?;
        let scope = self.resolve_scope(&request.root, &request.include_globs, &request.exclude_globs)?;
        let snapshot = self.snapshot(&scope, &request.policy, request.snapshot_max_files);
        let plan = self.compile(request, &scope);
        Ok(PreparedSearch {
            scope,
            snapshot,
            plan,
        })
    }

    /// Run every probe the plan calls for. The first failing probe (lowest id)
    /// aborts the run and no results are produced.
    pub fn execute(&self, prepared: &PreparedSearch) -> Result<SearchOutcome> {
        let mut plan = prepared.plan.clone();
        let context = ProbeContext {
            scope: prepared.scope.clone(),
            matching: plan.matching,
            policy: plan.policy,
        };
        let runner = ProbeRunner::new(self.backend.as_ref(), &context);

        let specs = phase_one(plan.strategy, &plan.terms.base, plan.bounds.max_probes);
        info!("Strategy {}: {} phase-1 probe(s)", plan.strategy, specs.len());

        let mut hits: Vec<Hit> = Vec::new();
        let mut ledger: Vec<ProbeLedgerEntry> = Vec::new();
        for result in run_probes(&runner, specs) {
            let outcome = result.map_err(|f| GrapeError::ProbeFailed(Box::new(f)))?;
            hits.extend(outcome.hits);
            ledger.push(outcome.entry);
        }

        let mut derivation = None;
        if plan.strategy == Strategy::Cascade && !hits.is_empty() {
            let derived = derive_terms(&hits, &plan.terms.base, bound_cap(plan.bounds.max_derived));
            info!("Derived {} term(s) from {} hits", derived.terms.len(), hits.len());
            plan.terms.derived = derived.terms.clone();

            if !derived.is_empty() {
                let next_id = ledger.iter().map(|e| e.probe_id.0).max().unwrap_or(0) + 1;
                let spec = ProbeSpec::new(next_id, PHASE_DERIVED, derived.terms.clone());
                let outcome = runner
                    .run(&spec)
                    .map_err(|f| GrapeError::ProbeFailed(Box::new(f)))?;
                hits.extend(outcome.hits);
                ledger.push(outcome.entry);
            }
            derivation = Some(derived);
        } else {
            debug!("No derivation phase");
        }

        let result = aggregate(
            hits,
            &ledger,
            &prepared.snapshot,
            &prepared.scope,
            plan.bounds.max_output_hits,
        );
        let next_step = suggest(&plan, result.summary.matches);
        info!(
            "Results: {} matches in {} files ({} probes, truncated={})",
            result.summary.matches,
            result.summary.files_with_matches,
            result.summary.probes_run,
            result.summary.truncated
        );

        Ok(SearchOutcome {
            plan,
            derivation,
            summary: result.summary,
            hits: result.hits,
            ledger,
            next_step,
        })
    }

    /// `prepare` then `execute`
    pub fn run(&self, request: &GrepRequest) -> Result<(PreparedSearch, SearchOutcome)> {
        let prepared = self.prepare(request)?;
        let outcome = self.execute(&prepared)?;
        Ok((prepared, outcome))
    }
}
