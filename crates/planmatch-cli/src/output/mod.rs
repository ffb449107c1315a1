//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use planmatch_core::{PipelineOutcome, PlanPricing};

/// Format options
pub struct FormatOptions {
    /// Include irrelevant and over-budget documents
    pub all: bool,
}

/// Format a pipeline run
pub fn format_outcome(
    outcome: &PipelineOutcome,
    format: OutputFormat,
    options: &FormatOptions,
) -> String {
    match format {
        OutputFormat::Json => json::format_outcome(outcome),
        OutputFormat::Cli => terminal::format_outcome(outcome, options),
    }
}

/// Format extracted price rows
pub fn format_pricing(plans: &[PlanPricing], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_pricing(plans),
        OutputFormat::Cli => terminal::format_pricing(plans),
    }
}
