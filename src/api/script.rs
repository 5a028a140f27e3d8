use crate::core::{EngineError, Scenario};

const SAVINGS_KEYWORDS: [&str; 2] = ["savings growth", "future value"];
const REVOLVING_KEYWORDS: [&str; 2] = ["credit card", "revolving"];
const TARGET_TERM_KEYWORDS: [&str; 5] = [
    "calculator",
    "required overpayment",
    "run_calculator",
    "overpayment simulation",
    "target",
];
const OVERPAYMENT_KEYWORDS: [&str; 7] = [
    "mortgage simulation",
    "eu mortgage",
    "uk mortgage",
    "overpayment summary",
    "overpayment",
    "other loan",
    "mortgage",
];

/// Lower-cases the script name and collapses runs of whitespace.
pub fn normalize_script(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Maps a free-text script name onto a scenario. The first matching rule
/// wins, so "rollover export" never resolves to the plain rollover.
pub fn resolve_script(raw: &str) -> Result<Scenario, EngineError> {
    let script = normalize_script(raw);
    let scenario = if contains_any(&script, &SAVINGS_KEYWORDS) {
        Scenario::SavingsGrowth
    } else if script.contains("export") && script.contains("rollover") {
        Scenario::RolloverExport
    } else if script.contains("rollover") {
        Scenario::Rollover
    } else if script.contains("refinance") {
        Scenario::Refinance
    } else if contains_any(&script, &REVOLVING_KEYWORDS) {
        Scenario::Revolving
    } else if contains_any(&script, &TARGET_TERM_KEYWORDS) {
        Scenario::TargetTerm
    } else if contains_any(&script, &OVERPAYMENT_KEYWORDS) {
        Scenario::Overpayment
    } else {
        return Err(EngineError::UnknownScript {
            received: raw.to_string(),
            normalized: script,
        });
    };
    Ok(scenario)
}
