//! Band command

use crate::app::{BandArgs, OutputFormat};
use anyhow::Result;
use planmatch_core::AgeBand;

pub fn run(args: BandArgs, format: OutputFormat) -> Result<()> {
    let band = AgeBand::from_age(args.age);
    let (lower, upper) = band.range();

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "age": args.age,
                "band": band.number(),
                "label": band.label(),
                "minAge": lower,
                "maxAge": upper,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Cli => {
            println!("age {}: {}, {}", args.age, band, band.label());
        }
    }
    Ok(())
}
