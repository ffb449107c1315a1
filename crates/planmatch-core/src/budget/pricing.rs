//! Price-table extraction from plan document text
//!
//! Two row shapes are recognised, both as pipe-separated table rows with
//! optional outer pipes:
//!
//! ```text
//! | Plano Essencial | Amil | R$ 320,00 | R$ 450,00 | R$ 780,00 | R$ 1.250,00 | R$ 1.980,00 |
//! | Plano Essencial | Amil | R$ 450,00 |
//! ```
//!
//! The first carries one price per age band. The second is a base price and is
//! read as the band 2 price. Header and separator rows yield no price and are
//! skipped, so any unparseable text simply produces no rows.
//!
//! Amounts only count as prices when the row writes them as currency
//! (`R$`) or a header above it in the same table names a price column
//! (Mensalidade, Valor, Preço). Carência or vigência tables with bare
//! numbers produce nothing.

use super::AgeBand;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One plan row from a price table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPricing {
    pub plan_name: String,
    pub operator: String,
    /// Monthly price per age band, band 1 first
    pub prices: [Option<f64>; AgeBand::COUNT],
}

impl PlanPricing {
    pub fn price_for(&self, band: AgeBand) -> Option<f64> {
        self.prices[band.index()]
    }

    fn same_plan(&self, plan_name: &str, operator: &str) -> bool {
        self.plan_name.to_lowercase() == plan_name.to_lowercase()
            && self.operator.to_lowercase() == operator.to_lowercase()
    }
}

/// Band the single price of a base-price row stands for
const BASE_PRICE_BAND: usize = 1;

const CELL: &str = r"([^|\n]+?)";
const PRICE_CELL: &str = r"([^|\n]*?)";
const SEP: &str = r"[ \t]*\|[ \t]*";

lazy_static! {
    static ref DETAILED_ROW_RE: Regex = Regex::new(&format!(
        r"^[ \t]*\|?[ \t]*{c}{s}{c}{s}{p}{s}{p}{s}{p}{s}{p}{s}{p}[ \t]*\|?[ \t\r]*$",
        c = CELL,
        p = PRICE_CELL,
        s = SEP
    ))
    .unwrap();
    static ref BASE_ROW_RE: Regex = Regex::new(&format!(
        r"^[ \t]*\|?[ \t]*{c}{s}{c}{s}{p}[ \t]*\|?[ \t\r]*$",
        c = CELL,
        p = PRICE_CELL,
        s = SEP
    ))
    .unwrap();
    static ref BRL_RE: Regex =
        Regex::new(r"^(\d{1,3}(?:\.\d{3})+|\d+)(?:,(\d{1,2}))?$").unwrap();
    static ref PRICE_HEADER_RE: Regex =
        Regex::new(r"(?i)\b(?:mensalidades?|valor(?:es)?|pre[çc]os?)\b").unwrap();
}

/// Parse a Brazilian currency amount such as `R$ 1.234,56`
pub fn parse_brl(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let amount = trimmed
        .strip_prefix("R$")
        .or_else(|| trimmed.strip_prefix("r$"))
        .unwrap_or(trimmed)
        .trim();

    let caps = BRL_RE.captures(amount)?;
    let integer = caps.get(1)?.as_str().replace('.', "");
    let value: f64 = match caps.get(2) {
        Some(cents) => format!("{}.{}", integer, cents.as_str()).parse().ok()?,
        None => integer.parse().ok()?,
    };

    (value > 0.0 && value.is_finite()).then_some(value)
}

fn is_label(cell: &str) -> bool {
    cell.chars().any(char::is_alphabetic)
}

fn has_currency(cell: &str) -> bool {
    cell.to_uppercase().contains("R$")
}

/// A pipe row plus whether a price header precedes it in its table
struct TableLine<'a> {
    text: &'a str,
    price_header: bool,
}

/// Pipe rows of `content`; a line without a pipe ends the current table
fn table_lines(content: &str) -> Vec<TableLine<'_>> {
    let mut lines = Vec::new();
    let mut price_header = false;

    for text in content.lines() {
        if !text.contains('|') {
            price_header = false;
            continue;
        }
        let has_amount = text.split('|').any(|cell| parse_brl(cell).is_some());
        if !has_amount && PRICE_HEADER_RE.is_match(text) {
            price_header = true;
        }
        lines.push(TableLine { text, price_header });
    }

    lines
}

/// Extract every plan price row from `content`; `None` when there are none
pub fn extract_pricing(content: &str) -> Option<Vec<PlanPricing>> {
    let lines = table_lines(content);
    let mut plans: Vec<PlanPricing> = Vec::new();

    for line in &lines {
        let Some(caps) = DETAILED_ROW_RE.captures(line.text) else {
            continue;
        };
        let plan_name = caps[1].trim();
        let operator = caps[2].trim();
        if !is_label(plan_name) || !is_label(operator) {
            continue;
        }
        if !line.price_header && !(3..8).any(|i| has_currency(&caps[i])) {
            continue;
        }

        let mut prices = [None; AgeBand::COUNT];
        for (band, price) in prices.iter_mut().enumerate() {
            *price = parse_brl(&caps[band + 3]);
        }
        if prices.iter().all(Option::is_none) {
            continue;
        }

        plans.push(PlanPricing {
            plan_name: plan_name.to_string(),
            operator: operator.to_string(),
            prices,
        });
    }

    for line in &lines {
        let Some(caps) = BASE_ROW_RE.captures(line.text) else {
            continue;
        };
        let plan_name = caps[1].trim();
        let operator = caps[2].trim();
        if !is_label(plan_name) || !is_label(operator) {
            continue;
        }
        if !line.price_header && !has_currency(&caps[3]) {
            continue;
        }
        if plans.iter().any(|p| p.same_plan(plan_name, operator)) {
            continue;
        }
        let Some(price) = parse_brl(&caps[3]) else {
            continue;
        };

        let mut prices = [None; AgeBand::COUNT];
        prices[BASE_PRICE_BAND] = Some(price);
        plans.push(PlanPricing {
            plan_name: plan_name.to_string(),
            operator: operator.to_string(),
            prices,
        });
    }

    if plans.is_empty() {
        None
    } else {
        tracing::debug!("Extracted {} price rows", plans.len());
        Some(plans)
    }
}
