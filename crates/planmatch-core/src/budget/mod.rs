//! Price-based post-filtering
//!
//! Plan documents carry price tables keyed by the five regulatory age bands.
//! [`extract_pricing`] pulls those rows out of free text and [`BudgetFilter`]
//! partitions candidates by whether any plan fits the client's budget.

mod filter;
mod pricing;

pub use filter::{BudgetCounts, BudgetFilter, BudgetFilterResult};
pub use pricing::{extract_pricing, parse_brl, PlanPricing};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Regulatory age band (1..=5) used for price tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AgeBand(u8);

impl AgeBand {
    pub const COUNT: usize = 5;

    /// Upper age bound of bands 1..=4; band 5 is open-ended
    const UPPER_BOUNDS: [u32; 4] = [18, 38, 59, 75];

    pub fn from_age(age: u32) -> Self {
        let band = Self::UPPER_BOUNDS
            .iter()
            .position(|&upper| age <= upper)
            .unwrap_or(Self::UPPER_BOUNDS.len());
        AgeBand(band as u8 + 1)
    }

    pub fn from_number(number: u8) -> Option<Self> {
        (1..=Self::COUNT as u8)
            .contains(&number)
            .then_some(AgeBand(number))
    }

    /// Band number, 1-based
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Position in a price array, 0-based
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    /// Inclusive age range; `None` upper bound for the last band
    pub fn range(&self) -> (u32, Option<u32>) {
        let i = self.index();
        let lower = if i == 0 { 0 } else { Self::UPPER_BOUNDS[i - 1] + 1 };
        (lower, Self::UPPER_BOUNDS.get(i).copied())
    }

    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "menor de idade",
            2 => "adulto jovem",
            3 => "adulto",
            4 => "sênior",
            _ => "idoso",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range() {
            (lower, Some(upper)) => write!(f, "faixa {} ({}-{} anos)", self.0, lower, upper),
            (lower, None) => write!(f, "faixa {} ({}+ anos)", self.0, lower),
        }
    }
}

impl TryFrom<u8> for AgeBand {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        AgeBand::from_number(value).ok_or_else(|| format!("age band must be 1-5, got {}", value))
    }
}

impl From<AgeBand> for u8 {
    fn from(band: AgeBand) -> u8 {
        band.0
    }
}
