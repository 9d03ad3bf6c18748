//! Presentation hints derived from free-text fields of a coordinator result.
//!
//! Keyword matching is case-insensitive substring search, so "no" also matches
//! inside words such as "know". Renderers only use these for styling.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolarity {
    Negative,
    Positive,
    Neutral,
}

const CRITICAL_MARKERS: [&str; 3] = ["high", "critical", "killer"];
const WARNING_MARKERS: [&str; 3] = ["medium", "concern", "warning"];
const NEGATIVE_MARKERS: [&str; 2] = ["not", "no"];
const POSITIVE_MARKERS: [&str; 2] = ["proceed", "yes"];
const UNRESOLVED_MARKER: &str = "not found";

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

pub fn severity_of(text: &str) -> Severity {
    let lower = text.to_lowercase();
    if contains_any(&lower, &CRITICAL_MARKERS) {
        Severity::Critical
    } else if contains_any(&lower, &WARNING_MARKERS) {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

pub fn decision_polarity_of(decision: &str) -> DecisionPolarity {
    let lower = decision.to_lowercase();
    if contains_any(&lower, &NEGATIVE_MARKERS) {
        DecisionPolarity::Negative
    } else if contains_any(&lower, &POSITIVE_MARKERS) {
        DecisionPolarity::Positive
    } else {
        DecisionPolarity::Neutral
    }
}

/// True for strings the agent filled with a "not found" placeholder.
pub fn is_unresolved(value: &Value) -> bool {
    match value {
        Value::String(text) => text.contains(UNRESOLVED_MARKER),
        _ => false,
    }
}

/// `proceed_with_caution` -> `PROCEED WITH CAUTION`.
pub fn display_decision(decision: &str) -> String {
    decision.replace('_', " ").to_uppercase()
}
