//! Error taxonomy for the search pipeline
//!
//! Every failure a command can surface maps onto one of two exit classes:
//! usage/validation problems (exit 2) and runtime failures of the external
//! engine (exit 1). Listing fallback is not an error and never reaches here.

use std::path::PathBuf;

use thiserror::Error;

use crate::probe::ProbeFailure;

/// Exit code for success
pub const EXIT_OK: u8 = 0;
/// Exit code for probe / runtime failures
pub const EXIT_RUNTIME: u8 = 1;
/// Exit code for usage and validation errors
pub const EXIT_USAGE: u8 = 2;

/// Library-wide result alias
pub type Result<T, E = GrapeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GrapeError {
    /// Bad flags, missing required input, conflicting options
    #[error("{0}")]
    Usage(String),

    /// Search root is missing or not a directory
    #[error("root not found or not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// Compiled plan failed validation; carries every violated constraint
    #[error("compiled plan is invalid ({} errors)", .0.len())]
    InvalidPlan(Vec<String>),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("invalid glob '{glob}': {message}")]
    InvalidGlob { glob: String, message: String },

    /// A probe could not run or exited with an unexpected status
    #[error("probe {} failed: {}", .0.plan.id, .0.error)]
    ProbeFailed(Box<ProbeFailure>),

    #[error("missing command: {0}")]
    EngineMissing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl GrapeError {
    pub fn usage(msg: impl Into<String>) -> Self {
        GrapeError::Usage(msg.into())
    }

    /// Process exit code for this error class
    pub fn exit_code(&self) -> u8 {
        match self {
            GrapeError::Usage(_)
            | GrapeError::InvalidRoot(_)
            | GrapeError::InvalidPlan(_)
            | GrapeError::UnknownStrategy(_)
            | GrapeError::InvalidGlob { .. }
            | GrapeError::Json(_) => EXIT_USAGE,
            GrapeError::ProbeFailed(_) | GrapeError::EngineMissing(_) | GrapeError::Io(_) => {
                EXIT_RUNTIME
            }
        }
    }

    /// Lines to print on the error stream, one per violated constraint
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            GrapeError::InvalidPlan(errors) => errors.iter().map(|e| format!("error: {e}")).collect(),
            GrapeError::ProbeFailed(failure) => vec![format!("probe error: {}", failure.error)],
            other => vec![format!("error: {other}")],
        }
    }
}
