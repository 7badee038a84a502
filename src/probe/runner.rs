//! Probe runner - one backend invocation, attributed and ledgered

use tracing::{debug, info};

use super::{
    Hit, ProbeContext, ProbeFailure, ProbeLedgerEntry, ProbeRecord, ProbeSpec, SearchBackend,
    SearchRequest,
};

/// Hits and the ledger entry of a completed probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub entry: ProbeLedgerEntry,
    pub hits: Vec<Hit>,
}

pub type ProbeResult = Result<ProbeOutcome, ProbeFailure>;

/// Runs probes for one search; shared read-only across worker threads
#[derive(Clone, Copy)]
pub struct ProbeRunner<'a> {
    backend: &'a dyn SearchBackend,
    context: &'a ProbeContext,
}

impl<'a> ProbeRunner<'a> {
    pub fn new(backend: &'a dyn SearchBackend, context: &'a ProbeContext) -> Self {
        Self { backend, context }
    }

    pub fn context(&self) -> &ProbeContext {
        self.context
    }

    /// Execute a single probe. Never retries.
    pub fn run(&self, spec: &ProbeSpec) -> ProbeResult {
        let argv = self.backend.probe_argv(&spec.patterns, self.context);
        let cwd = self.context.scope.root.resolved.clone();
        debug!("Probe {} (phase {}) starting: {:?}", spec.id, spec.phase, spec.patterns);

        let request = SearchRequest {
            argv: &argv,
            patterns: &spec.patterns,
            context: self.context,
        };
        let output = match self.backend.search(request) {
            Ok(output) => output,
            Err(e) => {
                return Err(ProbeFailure {
                    plan: ProbeRecord {
                        id: spec.id,
                        phase: spec.phase,
                        patterns: spec.patterns.clone(),
                        argv,
                        cwd,
                    },
                    error: e.to_string(),
                })
            }
        };

        let hits: Vec<Hit> = output
            .hits
            .into_iter()
            .map(|raw| Hit {
                path: raw.path,
                line: raw.line,
                snippet: raw.snippet,
                probe_id: spec.id,
                phase: spec.phase,
            })
            .collect();
        info!("Probe {} (phase {}) finished: {} hits", spec.id, spec.phase, hits.len());

        Ok(ProbeOutcome {
            entry: ProbeLedgerEntry {
                probe_id: spec.id,
                phase: spec.phase,
                patterns: spec.patterns.clone(),
                hit_count: hits.len(),
                files_searched: output.files_searched,
                files_with_match: output.files_with_match,
                argv,
                cwd,
            },
            hits,
        })
    }
}
