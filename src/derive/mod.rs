//! Term derivation - mine follow-up search terms from phase-1 evidence
//!
//! Pure functions over an immutable hit list. The heuristic is bounded and
//! deterministic; it may miss relevant terms or keep noise.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::probe::Hit;

/// Minimum occurrences for a digit-bearing, non-identifier token
pub const MIN_EVIDENCE_PLAIN: usize = 3;
/// Minimum occurrences for an identifier-like token
pub const MIN_EVIDENCE_IDENTIFIER: usize = 2;
/// Tokens present in a larger share of documents are too generic
pub const MAX_DOC_RATIO: f64 = 0.85;

const SAMPLE_SNIPPET_CHARS: usize = 200;

pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "for", "with", "from", "this", "that", "true", "false", "null", "none",
    "return", "class", "def", "function", "const", "let", "var", "public", "private",
    "protected", "static", "async", "await", "import", "export",
];

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]{2,}").expect("valid token regex"))
}

/// Thresholds recorded with every derived entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivationFilters {
    pub min_evidence_count_plain: usize,
    pub min_evidence_count_identifier: usize,
    pub max_doc_ratio: f64,
    pub require_identifier_like_or_digit: bool,
}

impl Default for DerivationFilters {
    fn default() -> Self {
        Self {
            min_evidence_count_plain: MIN_EVIDENCE_PLAIN,
            min_evidence_count_identifier: MIN_EVIDENCE_IDENTIFIER,
            max_doc_ratio: MAX_DOC_RATIO,
            require_identifier_like_or_digit: true,
        }
    }
}

/// One surviving candidate term
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedTermEntry {
    /// First spelling seen
    pub token: String,
    pub token_normalized: String,
    pub evidence_count: usize,
    pub doc_count: usize,
    pub doc_ratio: f64,
    pub sample_path: String,
    pub sample_snippet: String,
    pub filters: DerivationFilters,
}

/// Derived terms plus their audit entries, same order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Derivation {
    #[serde(rename = "derived_terms")]
    pub terms: Vec<String>,
    #[serde(rename = "ledger")]
    pub entries: Vec<DerivedTermEntry>,
}

impl Derivation {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[derive(Default)]
struct Tally<'h> {
    display: String,
    count: usize,
    docs: usize,
    sample: Option<&'h Hit>,
}

/// Contains `_`, or has a lowercase letter plus an uppercase one past the first char
pub fn is_identifier_like(token: &str) -> bool {
    if token.contains('_') {
        return true;
    }
    token.chars().any(char::is_lowercase) && token.chars().skip(1).any(char::is_uppercase)
}

/// Mine at most `max_derived` terms (`None` = unbounded) from `hits`
pub fn derive_terms(hits: &[Hit], base_terms: &[String], max_derived: Option<usize>) -> Derivation {
    let base: BTreeSet<String> = base_terms.iter().map(|t| t.to_lowercase()).collect();
    let total_docs = hits.len().max(1);

    let mut tallies: HashMap<String, Tally<'_>> = HashMap::new();
    for hit in hits {
        let text = hit
            .snippet
            .replace("\\n", " ")
            .replace("\\r", " ")
            .replace("\\t", " ");

        let mut in_doc: BTreeSet<String> = BTreeSet::new();
        for m in token_regex().find_iter(&text) {
            let token = m.as_str();
            let normalized = token.to_lowercase();
            if STOP_WORDS.contains(&normalized.as_str()) || base.contains(&normalized) {
                continue;
            }
            let tally = tallies.entry(normalized.clone()).or_insert_with(|| Tally {
                display: token.to_string(),
                sample: Some(hit),
                ..Default::default()
            });
            tally.count += 1;
            in_doc.insert(normalized);
        }
        for normalized in in_doc {
            if let Some(tally) = tallies.get_mut(&normalized) {
                tally.docs += 1;
            }
        }
    }

    let mut candidates: Vec<(String, Tally<'_>)> = tallies
        .into_iter()
        .filter(|(_, t)| passes_filters(t, total_docs))
        .collect();
    candidates.sort_by(|a, b| {
        b.1.count
            .cmp(&a.1.count)
            .then_with(|| b.1.docs.cmp(&a.1.docs))
            .then_with(|| a.0.cmp(&b.0))
    });
    if let Some(cap) = max_derived {
        candidates.truncate(cap);
    }

    let filters = DerivationFilters::default();
    let entries: Vec<DerivedTermEntry> = candidates
        .into_iter()
        .map(|(normalized, tally)| {
            let (sample_path, sample_snippet): (String, String) = tally
                .sample
                .map(|h| (h.path.clone(), h.snippet.chars().take(SAMPLE_SNIPPET_CHARS).collect()))
                .unwrap_or_default();
            DerivedTermEntry {
                token: tally.display,
                token_normalized: normalized,
                evidence_count: tally.count,
                doc_count: tally.docs,
                doc_ratio: round4(tally.docs as f64 / total_docs as f64),
                sample_path,
                sample_snippet,
                filters,
            }
        })
        .collect();

    Derivation {
        terms: entries.iter().map(|e| e.token.clone()).collect(),
        entries,
    }
}

fn passes_filters(tally: &Tally<'_>, total_docs: usize) -> bool {
    let ident = is_identifier_like(&tally.display);
    let digit = tally.display.chars().any(|c| c.is_ascii_digit());
    if !ident && !digit {
        return false;
    }
    let min = if ident {
        MIN_EVIDENCE_IDENTIFIER
    } else {
        MIN_EVIDENCE_PLAIN
    };
    if tally.count < min {
        return false;
    }
    (tally.docs as f64 / total_docs as f64) <= MAX_DOC_RATIO
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
