//! Probe module - one external search invocation per pattern subset
//!
//! - `SearchBackend`: the seam to the external search engine
//! - `RipgrepBackend`: the production backend (structured JSON events)
//! - `ProbeRunner`: turns backend output into hits + a ledger entry
//! - `scheduler`: strategy partitioning and the bounded worker pool

mod events;
mod ripgrep;
mod runner;
pub mod scheduler;

pub use events::{parse_events, EventCounts};
pub use ripgrep::RipgrepBackend;
pub use runner::{ProbeOutcome, ProbeResult, ProbeRunner};

use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

use crate::core::{MatchOptions, Policy, Scope};

// ============================================================================
// Identity
// ============================================================================

/// Probe identifier, displayed as `P<n>`; ordering is numeric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProbeId(pub u32);

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl Serialize for ProbeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Phase 1 probes use caller patterns; phase 2 uses derived terms
pub const PHASE_BASE: u8 = 1;
pub const PHASE_DERIVED: u8 = 2;

/// One probe to run: an id, a phase and a pattern subset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    pub id: ProbeId,
    pub phase: u8,
    pub patterns: Vec<String>,
}

impl ProbeSpec {
    pub fn new(id: u32, phase: u8, patterns: Vec<String>) -> Self {
        Self {
            id: ProbeId(id),
            phase,
            patterns,
        }
    }
}

/// Everything a probe needs besides its patterns; shared by all probes of a run
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub scope: Scope,
    pub matching: MatchOptions,
    pub policy: Policy,
}

// ============================================================================
// Records
// ============================================================================

/// One match line produced by a probe
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Hit {
    pub path: String,
    /// 1-based line number
    pub line: u64,
    pub snippet: String,
    pub probe_id: ProbeId,
    pub phase: u8,
}

/// A match as reported by the backend, before probe attribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHit {
    pub path: String,
    pub line: u64,
    pub snippet: String,
}

/// Parsed output of one backend search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutput {
    pub hits: Vec<RawHit>,
    pub files_searched: Option<u64>,
    pub files_with_match: Option<u64>,
}

/// Audit record of one executed probe
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProbeLedgerEntry {
    pub probe_id: ProbeId,
    pub phase: u8,
    pub patterns: Vec<String>,
    pub hit_count: usize,
    pub files_searched: Option<u64>,
    pub files_with_match: Option<u64>,
    pub argv: Vec<String>,
    pub cwd: String,
}

/// What was attempted by a failed probe
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProbeRecord {
    pub id: ProbeId,
    pub phase: u8,
    pub patterns: Vec<String>,
    pub argv: Vec<String>,
    pub cwd: String,
}

/// A probe that could not run or exited with an unexpected status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub plan: ProbeRecord,
    pub error: String,
}

impl Serialize for ProbeFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProbeFailure", 3)?;
        state.serialize_field("ok", &false)?;
        state.serialize_field("plan", &self.plan)?;
        state.serialize_field("error", &self.error)?;
        state.end()
    }
}

// ============================================================================
// Backend seam
// ============================================================================

#[derive(Debug, Error)]
pub enum BackendError {
    /// The engine binary could not be started
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Exit status outside {matched, no-match}
    #[error("{0}")]
    Status(String),
}

/// A single search invocation handed to the backend
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub argv: &'a [String],
    pub patterns: &'a [String],
    pub context: &'a ProbeContext,
}

/// External search engine used for listing and probing
pub trait SearchBackend: Send + Sync {
    /// Engine name recorded in plans
    fn tool(&self) -> &str;

    /// Whether the engine can be executed
    fn is_available(&self) -> bool;

    /// Root-relative, forward-slash paths of every file in scope
    fn list_files(&self, scope: &Scope, policy: &Policy) -> Result<Vec<String>, BackendError>;

    /// Command line that a probe with these patterns runs
    fn probe_argv(&self, patterns: &[String], context: &ProbeContext) -> Vec<String>;

    /// Run one probe
    fn search(&self, request: SearchRequest<'_>) -> Result<SearchOutput, BackendError>;
}
