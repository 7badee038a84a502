//! grape Library
//!
//! Deterministic, multi-strategy content search over a code tree. One run
//! produces a bounded surface snapshot, a reproducible search plan, results
//! in canonical order, a ledger of every probe issued and one next-step
//! suggestion.
//!
//! # Features
//!
//! - **Strategies**: `single`, `parallel` (bounded worker pool) and
//!   `cascade` (second probe on terms mined from first-phase evidence)
//! - **Deterministic**: results and ledger never depend on probe completion order
//! - **Degrades gracefully**: file listing falls back to a directory walk
//! - **Auditable**: every probe's argv, cwd and counts are recorded
//!
//! # Example
//!
//! ```no_run
//! use grape::core::{GrepEngine, GrepRequest, MatchOptions, Policy, Strategy};
//! use grape::probe::RipgrepBackend;
//! use std::sync::Arc;
//!
//! fn main() -> grape::error::Result<()> {
//!     let engine = GrepEngine::new(Arc::new(RipgrepBackend::default()), ".");
//!     let request = GrepRequest {
//!         root: ".".into(),
//!         patterns: vec!["load_config".into()],
//!         include_globs: vec!["src/**".into()],
//!         exclude_globs: vec![],
//!         matching: MatchOptions::default(),
//!         strategy: Strategy::Cascade,
//!         max_output_hits: 500,
//!         max_probes: 8,
//!         max_derived: 12,
//!         snapshot_max_files: 20000,
//!         policy: Policy::default(),
//!     };
//!
//!     let (_, outcome) = engine.run(&request)?;
//!     println!("{} matches", outcome.summary.matches);
//!     Ok(())
//! }
//! ```

pub mod advisor;
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod core;
pub mod derive;
pub mod error;
pub mod plan;
pub mod probe;
pub mod report;

// Re-export commonly used types
pub use config::Config;
pub use core::{GrepEngine, GrepRequest, PreparedSearch, Scope, SearchOutcome, SurfaceSnapshot};
pub use error::{GrapeError, Result};
pub use probe::{Hit, ProbeLedgerEntry, RipgrepBackend, SearchBackend};
