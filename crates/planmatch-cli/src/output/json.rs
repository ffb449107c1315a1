//! JSON output formatter

use planmatch_core::{PipelineOutcome, PlanPricing};

pub fn format_outcome(outcome: &PipelineOutcome) -> String {
    serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_pricing(plans: &[PlanPricing]) -> String {
    serde_json::to_string_pretty(plans).unwrap_or_else(|_| "[]".to_string()) + "\n"
}
