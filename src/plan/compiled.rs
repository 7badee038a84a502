//! Compiled plan validation
//!
//! A compiled plan is a JSON document produced ahead of time by a planner.
//! Validation inspects the raw value and collects every violation before
//! failing; only a fully valid document is turned into a typed plan.

use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::PolicyFlags;
use crate::core::{CaseMode, GrepRequest, MatchMode, MatchOptions, Strategy};
use crate::error::{GrapeError, Result};
use crate::report::OutputFormat;

pub const COMPILED_PLAN_SCHEMA: &str = "grape_compiled_plan_v1";
pub const INTENT_SCHEMA: &str = "grape_intent_v1";

const MODES: &[&str] = &["fixed", "regex"];
const CASES: &[&str] = &["insensitive", "sensitive", "smart"];
const FORMATS: &[&str] = &["auto", "human", "jsonl"];
const STRATEGIES: &[&str] = &["cascade", "parallel", "single"];

/// The `grep` section, typed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GrepSection {
    pub root: String,
    pub pattern: Vec<String>,
    #[serde(default)]
    pub glob: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    pub mode: MatchMode,
    pub case: CaseMode,
    pub format: OutputFormat,
    pub context: u32,
    pub max_lines: i64,
    pub strategy: Strategy,
    pub max_probes: usize,
    pub max_derived: i64,
    pub snapshot_max_files: i64,
    pub policy: PolicyFlags,
}

/// A validated compiled plan
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    pub intent_hash: String,
    pub grep: GrepSection,
    /// The document as supplied, re-emitted verbatim
    pub raw: Value,
}

impl CompiledPlan {
    /// Search request carried by the plan; config defaults never apply
    pub fn to_request(&self) -> GrepRequest {
        let g = &self.grep;
        GrepRequest {
            root: g.root.clone(),
            patterns: g.pattern.clone(),
            include_globs: g.glob.clone().unwrap_or_default(),
            exclude_globs: g.exclude.clone().unwrap_or_default(),
            matching: MatchOptions {
                mode: g.mode,
                case: g.case,
                context: g.context,
            },
            strategy: g.strategy,
            max_output_hits: g.max_lines,
            max_probes: g.max_probes,
            max_derived: g.max_derived,
            snapshot_max_files: g.snapshot_max_files,
            policy: g.policy.to_policy(),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.grep.format
    }
}

// ============================================================================
// Canonical JSON + intent hash
// ============================================================================

/// Keys sorted at every level, no insignificant whitespace, non-ASCII verbatim
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// `sha256:<hex>` of the canonical JSON of `intent`
pub fn intent_hash(intent: &Value) -> String {
    let digest = Sha256::digest(canonical_json(intent).as_bytes());
    format!("sha256:{}", hex::encode(digest))
}

fn is_intent_hash(s: &str) -> bool {
    s.strip_prefix("sha256:").is_some_and(|h| {
        h.len() == 64 && h.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    })
}

// ============================================================================
// Validation
// ============================================================================

/// Validate a compiled plan, reporting every violation at once
pub fn validate(raw: Value) -> Result<CompiledPlan> {
    let errors = collect_errors(&raw);
    if !errors.is_empty() {
        return Err(GrapeError::InvalidPlan(errors));
    }

    let intent_hash = raw
        .get("intent_hash")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let grep_value = raw.get("grep").cloned().unwrap_or(Value::Null);
    let grep: GrepSection = serde_json::from_value(grep_value)
        .map_err(|e| GrapeError::InvalidPlan(vec![format!("grep: {e}")]))?;

    Ok(CompiledPlan {
        intent_hash,
        grep,
        raw,
    })
}

fn collect_errors(raw: &Value) -> Vec<String> {
    let Some(plan) = raw.as_object() else {
        return vec!["compiled plan must be a JSON object".to_string()];
    };
    let mut errors = Vec::new();

    if plan.get("schema").and_then(Value::as_str) != Some(COMPILED_PLAN_SCHEMA) {
        errors.push(format!("schema must be {COMPILED_PLAN_SCHEMA}"));
    }

    let intent = plan.get("intent").and_then(Value::as_object);
    match intent {
        None => errors.push("intent object missing or invalid".to_string()),
        Some(intent) => {
            if intent.get("schema").and_then(Value::as_str) != Some(INTENT_SCHEMA) {
                errors.push(format!("intent.schema must be {INTENT_SCHEMA}"));
            }
            let prompt_ok = intent
                .get("prompt")
                .and_then(Value::as_str)
                .is_some_and(|p| !p.trim().is_empty());
            if !prompt_ok {
                errors.push("intent.prompt must be a non-empty string".to_string());
            }
        }
    }

    match plan.get("intent_hash").and_then(Value::as_str) {
        Some(hash) if is_intent_hash(hash) => {
            if let Some(intent) = plan.get("intent").filter(|v| v.is_object()) {
                if hash != intent_hash(intent) {
                    errors.push("intent_hash does not match computed sha256 of intent".to_string());
                }
            }
        }
        _ => errors.push("intent_hash must be sha256:<64 hex chars>".to_string()),
    }

    match plan.get("grep").and_then(Value::as_object) {
        None => errors.push("grep object missing or invalid".to_string()),
        Some(grep) => check_grep(grep, &mut errors),
    }
    errors
}

fn check_grep(grep: &Map<String, Value>, errors: &mut Vec<String>) {
    if !grep
        .get("root")
        .and_then(Value::as_str)
        .is_some_and(|r| !r.is_empty())
    {
        errors.push("grep.root must be a non-empty string".to_string());
    }

    match grep.get("pattern").and_then(Value::as_array) {
        Some(patterns) if !patterns.is_empty() => {
            if !patterns.iter().all(non_empty_str) {
                errors.push("each grep.pattern entry must be a non-empty string".to_string());
            }
        }
        _ => errors.push("grep.pattern must be a non-empty array of strings".to_string()),
    }

    for field in ["glob", "exclude"] {
        match grep.get(field) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                if !items.iter().all(non_empty_str) {
                    errors.push(format!("grep.{field} entries must be non-empty strings"));
                }
            }
            Some(_) => errors.push(format!("grep.{field} must be an array of strings")),
        }
    }

    check_choice(grep, "mode", MODES, errors);
    check_choice(grep, "case", CASES, errors);
    check_choice(grep, "format", FORMATS, errors);
    check_choice(grep, "strategy", STRATEGIES, errors);

    check_int(grep, "context", 0, Some(10), errors);
    check_int(grep, "max_lines", 0, None, errors);
    check_int(grep, "max_probes", 1, None, errors);
    check_int(grep, "max_derived", 0, None, errors);
    check_int(grep, "snapshot_max_files", 1000, None, errors);

    match grep.get("policy").and_then(Value::as_object) {
        None => errors.push("grep.policy is required".to_string()),
        Some(policy) => {
            for field in ["hidden", "follow"] {
                if !policy.get(field).is_some_and(Value::is_boolean) {
                    errors.push(format!("grep.policy.{field} must be boolean"));
                }
            }
            match policy.get("ignore").and_then(Value::as_object) {
                None => errors.push("grep.policy.ignore must be an object".to_string()),
                Some(ignore) => {
                    for field in ["no_ignore", "no_ignore_vcs", "no_ignore_global"] {
                        if !ignore.get(field).is_some_and(Value::is_boolean) {
                            errors.push(format!("grep.policy.ignore.{field} must be boolean"));
                        }
                    }
                }
            }
        }
    }
}

fn non_empty_str(v: &Value) -> bool {
    v.as_str().is_some_and(|s| !s.is_empty())
}

fn check_choice(grep: &Map<String, Value>, field: &str, allowed: &[&str], errors: &mut Vec<String>) {
    let ok = grep
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|v| allowed.contains(&v));
    if !ok {
        let listed: Vec<String> = allowed.iter().map(|a| format!("'{a}'")).collect();
        errors.push(format!("grep.{field} must be one of [{}]", listed.join(", ")));
    }
}

fn check_int(
    grep: &Map<String, Value>,
    field: &str,
    minimum: i64,
    maximum: Option<i64>,
    errors: &mut Vec<String>,
) {
    let Some(value) = grep.get(field).and_then(Value::as_i64) else {
        errors.push(format!("grep.{field} must be an integer"));
        return;
    };
    if value < minimum {
        errors.push(format!("grep.{field} must be >= {minimum}"));
    }
    if let Some(maximum) = maximum {
        if value > maximum {
            errors.push(format!("grep.{field} must be <= {maximum}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn good_plan() -> Value {
        let intent = json!({"schema": INTENT_SCHEMA, "prompt": "find the config loader"});
        json!({
            "schema": COMPILED_PLAN_SCHEMA,
            "intent_hash": intent_hash(&intent),
            "intent": intent,
            "grep": {
                "root": ".",
                "pattern": ["load_config"],
                "glob": ["src/**"],
                "mode": "fixed",
                "case": "smart",
                "format": "jsonl",
                "context": 0,
                "max_lines": 500,
                "strategy": "cascade",
                "max_probes": 8,
                "max_derived": 12,
                "snapshot_max_files": 20000,
                "policy": {
                    "hidden": false,
                    "follow": false,
                    "ignore": {"no_ignore": false, "no_ignore_vcs": false, "no_ignore_global": false}
                }
            }
        })
    }

    #[test]
    fn test_canonical_json_sorts_keys_and_keeps_unicode() {
        let v = json!({"b": 1, "a": {"d": [true, null], "c": "é"}});
        assert_eq!(canonical_json(&v), r#"{"a":{"c":"é","d":[true,null]},"b":1}"#);
    }

    #[test]
    fn test_intent_hash_shape() {
        let hash = intent_hash(&json!({"prompt": "x"}));
        assert!(is_intent_hash(&hash));
        assert_eq!(hash, intent_hash(&json!({"prompt": "x"})));
    }

    #[test]
    fn test_valid_plan_converts_to_request() {
        let plan = validate(good_plan()).unwrap();
        let request = plan.to_request();
        assert_eq!(request.patterns, vec!["load_config"]);
        assert_eq!(request.include_globs, vec!["src/**"]);
        assert!(request.exclude_globs.is_empty());
        assert_eq!(request.strategy, Strategy::Cascade);
        assert_eq!(plan.format(), OutputFormat::Jsonl);
    }

    #[test]
    fn test_all_errors_are_collected() {
        let mut plan = good_plan();
        plan["schema"] = json!("nope");
        plan["grep"]["context"] = json!(11);
        plan["grep"]["max_probes"] = json!(0);
        plan["grep"]["strategy"] = json!("fanout");
        plan["grep"]["policy"]["ignore"]["no_ignore"] = json!("yes");

        let Err(GrapeError::InvalidPlan(errors)) = validate(plan) else {
            panic!("expected InvalidPlan");
        };
        assert_eq!(
            errors,
            vec![
                "schema must be grape_compiled_plan_v1",
                "grep.strategy must be one of ['cascade', 'parallel', 'single']",
                "grep.context must be <= 10",
                "grep.max_probes must be >= 1",
                "grep.policy.ignore.no_ignore must be boolean",
            ]
        );
    }

    #[test]
    fn test_tampered_intent_is_detected() {
        let mut plan = good_plan();
        plan["intent"]["prompt"] = json!("something else");
        let Err(GrapeError::InvalidPlan(errors)) = validate(plan) else {
            panic!("expected InvalidPlan");
        };
        assert_eq!(errors, vec!["intent_hash does not match computed sha256 of intent"]);
    }

    #[test]
    fn test_non_object_plan() {
        let Err(GrapeError::InvalidPlan(errors)) = validate(json!([1, 2])) else {
            panic!("expected InvalidPlan");
        };
        assert_eq!(errors, vec!["compiled plan must be a JSON object"]);
    }

    #[test]
    fn test_missing_grep_section() {
        let mut plan = good_plan();
        plan.as_object_mut().unwrap().remove("grep");
        let Err(GrapeError::InvalidPlan(errors)) = validate(plan) else {
            panic!("expected InvalidPlan");
        };
        assert_eq!(errors, vec!["grep object missing or invalid"]);
    }
}
