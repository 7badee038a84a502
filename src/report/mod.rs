//! Report module - jsonl event stream and human-readable sections
//!
//! Every jsonl line is `{"data": ..., "kind": ...}` with keys sorted at every
//! level. Human output carries the same information as labeled sections.

mod human;

use std::io::Write;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{SearchOutcome, SurfaceSnapshot};
use crate::error::Result;
use crate::plan::{canonical_json, CompiledPlan, SearchPlan, SurfacePlan};
use crate::probe::ProbeFailure;

pub const PROBE_LEDGER_SCHEMA: &str = "probe_ledger_v1";
pub const DERIVATION_LEDGER_SCHEMA: &str = "derivation_ledger_v1";

/// Output format for stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human for a terminal, jsonl otherwise
    #[default]
    Auto,
    /// Labeled text sections
    Human,
    /// One JSON event per line
    Jsonl,
}

impl OutputFormat {
    /// Resolve `auto` against whether stdout is a terminal
    pub fn resolve(self, stdout_isatty: bool) -> Self {
        match self {
            OutputFormat::Auto if stdout_isatty => OutputFormat::Human,
            OutputFormat::Auto => OutputFormat::Jsonl,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Auto => "auto",
            OutputFormat::Human => "human",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// Whether stdout is an interactive terminal
pub fn stdout_isatty() -> bool {
    console::Term::stdout().is_term()
}

/// Writes events in the resolved format
pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> Reporter<W> {
    /// `format` should already be resolved; `auto` renders as jsonl
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn is_jsonl(&self) -> bool {
        self.format != OutputFormat::Human
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// One jsonl line
    pub fn event<T: Serialize + ?Sized>(&mut self, kind: &str, data: &T) -> Result<()> {
        let line = json!({ "kind": kind, "data": serde_json::to_value(data)? });
        writeln!(self.out, "{}", canonical_json(&line))?;
        Ok(())
    }

    pub fn compiled_plan(&mut self, plan: &CompiledPlan) -> Result<()> {
        if self.is_jsonl() {
            self.event("compiled_plan", &plan.raw)
        } else {
            human::compiled_plan(&mut self.out, plan)
        }
    }

    pub fn surface_plan(&mut self, plan: &SurfacePlan) -> Result<()> {
        if self.is_jsonl() {
            self.event("surface_plan", plan)
        } else {
            Ok(())
        }
    }

    pub fn snapshot(&mut self, snapshot: &SurfaceSnapshot) -> Result<()> {
        if self.is_jsonl() {
            self.event("surface_snapshot", snapshot)
        } else {
            human::snapshot(&mut self.out, snapshot)
        }
    }

    pub fn search_plan(&mut self, plan: &SearchPlan) -> Result<()> {
        if self.is_jsonl() {
            self.event("search_plan", plan)
        } else {
            human::search_plan(&mut self.out, plan)
        }
    }

    /// Everything after the plan: derivation, results, ledgers, next step
    pub fn outcome(&mut self, outcome: &SearchOutcome) -> Result<()> {
        if !self.is_jsonl() {
            return human::outcome(&mut self.out, outcome);
        }

        if let Some(derivation) = &outcome.derivation {
            self.event("cascade_derivation", derivation)?;
        }
        self.event("results", &outcome.summary)?;
        if outcome.summary.matches == 0 {
            self.event("no_matches", &json!({ "summary": outcome.summary }))?;
        } else {
            for hit in &outcome.hits {
                self.event("hit", hit)?;
            }
        }
        self.event(
            "probe_ledger",
            &json!({ "schema": PROBE_LEDGER_SCHEMA, "probes": outcome.ledger }),
        )?;
        if let Some(derivation) = &outcome.derivation {
            self.event(
                "derivation_ledger",
                &json!({ "schema": DERIVATION_LEDGER_SCHEMA, "entries": derivation.entries }),
            )?;
        }
        self.event("next_step", &outcome.next_step)
    }

    /// Structured probe failure (jsonl only; human mode reports on stderr)
    pub fn probe_error(&mut self, failure: &ProbeFailure) -> Result<()> {
        self.event("probe_error", failure)
    }
}
