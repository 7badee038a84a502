//! Next-step advisor - exactly one suggestion per run

use serde::Serialize;

use crate::core::{CaseMode, MatchMode};
use crate::plan::SearchPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReadNext,
    Widen,
}

/// Plan dimension a `widen` suggestion relaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    IncludeGlobs,
    Mode,
    Case,
    Terms,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::IncludeGlobs => "include_globs",
            Axis::Mode => "mode",
            Axis::Case => "case",
            Axis::Terms => "terms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextStepSuggestion {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
    pub note: &'static str,
}

impl NextStepSuggestion {
    fn widen(axis: Axis, note: &'static str) -> Self {
        Self {
            action: Action::Widen,
            axis: Some(axis),
            note,
        }
    }
}

/// Decide the next action from the plan and the total match count
pub fn suggest(plan: &SearchPlan, match_count: usize) -> NextStepSuggestion {
    if match_count > 0 {
        return NextStepSuggestion {
            action: Action::ReadNext,
            axis: None,
            note: "Pick 1-2 high-signal files from hits and read narrowly.",
        };
    }

    if !plan.scope.include_globs.is_empty() {
        NextStepSuggestion::widen(Axis::IncludeGlobs, "Remove or relax include globs.")
    } else if plan.matching.mode == MatchMode::Fixed {
        NextStepSuggestion::widen(Axis::Mode, "Retry with --mode regex (one pass).")
    } else if plan.matching.case == CaseMode::Sensitive {
        NextStepSuggestion::widen(Axis::Case, "Retry with --case smart.")
    } else {
        NextStepSuggestion::widen(Axis::Terms, "Add 1-2 synonyms (bounded) and rerun.")
    }
}
