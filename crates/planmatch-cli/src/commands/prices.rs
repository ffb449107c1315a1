//! Prices command

use crate::app::{OutputFormat, PricesArgs};
use crate::output;
use anyhow::{Context, Result};
use planmatch_core::extract_pricing;

pub fn run(args: PricesArgs, format: OutputFormat) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let plans = extract_pricing(&content).unwrap_or_default();
    if plans.is_empty() && format == OutputFormat::Cli {
        eprintln!("No price table found in {}", args.file.display());
        return Ok(());
    }

    print!("{}", output::format_pricing(&plans, format));
    Ok(())
}
