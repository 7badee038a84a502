//! Ripgrep backend - file listing and JSON-event probes

use std::process::{Command, Output};

use tracing::debug;

use super::events::parse_events;
use super::{BackendError, ProbeContext, SearchBackend, SearchOutput, SearchRequest};
use crate::core::{normalize_rel, CaseMode, MatchMode, Policy, Scope};

/// Exit status for "matches found"
const EXIT_MATCHED: i32 = 0;
/// Exit status for "searched, nothing matched"
const EXIT_NO_MATCH: i32 = 1;

/// Invokes the `rg` binary
#[derive(Debug, Clone)]
pub struct RipgrepBackend {
    binary: String,
}

impl Default for RipgrepBackend {
    fn default() -> Self {
        Self::new("rg")
    }
}

impl RipgrepBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// `rg --files` command line for a scope
    pub fn listing_argv(&self, scope: &Scope, policy: &Policy) -> Vec<String> {
        let mut argv = vec![self.binary.clone(), "--files".to_string()];
        argv.extend(policy.engine_flags().into_iter().map(String::from));
        push_globs(&mut argv, scope);
        argv.push(".".to_string());
        argv
    }

    fn exec(&self, argv: &[String], scope: &Scope) -> Result<Output, BackendError> {
        debug!("exec {:?} in {}", argv, scope.root_path.display());
        Command::new(&argv[0])
            .args(&argv[1..])
            .current_dir(&scope.root_path)
            .output()
            .map_err(|source| BackendError::Spawn {
                tool: self.binary.clone(),
                source,
            })
    }

    /// Accept {matched, no-match}; anything else is a failure
    fn check_status(&self, output: &Output, what: &str) -> Result<(), BackendError> {
        match output.status.code() {
            Some(EXIT_MATCHED) | Some(EXIT_NO_MATCH) => Ok(()),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim();
                let message = if !stderr.is_empty() {
                    stderr.to_string()
                } else if let Some(code) = code {
                    format!("{what} exited with status {code}")
                } else {
                    format!("{what} terminated by signal")
                };
                Err(BackendError::Status(message))
            }
        }
    }
}

impl SearchBackend for RipgrepBackend {
    fn tool(&self) -> &str {
        "rg"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn list_files(&self, scope: &Scope, policy: &Policy) -> Result<Vec<String>, BackendError> {
        let argv = self.listing_argv(scope, policy);
        let output = self.exec(&argv, scope)?;
        self.check_status(&output, "rg --files")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut files: Vec<String> = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| normalize_rel(l).to_string())
            .collect();
        files.sort();
        Ok(files)
    }

    fn probe_argv(&self, patterns: &[String], context: &ProbeContext) -> Vec<String> {
        let mut argv = vec![
            self.binary.clone(),
            "--json".to_string(),
            "--sort".to_string(),
            "path".to_string(),
        ];
        argv.extend(context.policy.engine_flags().into_iter().map(String::from));

        if context.matching.mode == MatchMode::Fixed {
            argv.push("-F".to_string());
        }
        match context.matching.case {
            CaseMode::Sensitive => {}
            CaseMode::Insensitive => argv.push("-i".to_string()),
            CaseMode::Smart => argv.push("-S".to_string()),
        }
        if context.matching.context > 0 {
            argv.push("-C".to_string());
            argv.push(context.matching.context.to_string());
        }

        push_globs(&mut argv, &context.scope);
        for pattern in patterns {
            argv.push("-e".to_string());
            argv.push(pattern.clone());
        }
        argv.push(".".to_string());
        argv
    }

    fn search(&self, request: SearchRequest<'_>) -> Result<SearchOutput, BackendError> {
        let output = self.exec(request.argv, &request.context.scope)?;
        self.check_status(&output, "rg")?;
        Ok(parse_events(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn push_globs(argv: &mut Vec<String>, scope: &Scope) {
    for glob in &scope.include_globs {
        argv.push("-g".to_string());
        argv.push(glob.clone());
    }
    for glob in &scope.exclude_globs {
        argv.push("-g".to_string());
        argv.push(format!("!{glob}"));
    }
}
