//! Terminal output formatter

use super::FormatOptions;
use planmatch_core::{GradedDocument, PipelineOutcome, PlanPricing};
use serde::Serialize;

const BAND_HEADERS: [&str; 5] = ["0-18", "19-38", "39-59", "60-75", "76+"];

/// Render an amount as Brazilian currency, e.g. `R$ 1.450,00`
pub fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    format!("R$ {},{:02}", grouped, cents % 100)
}

/// Serialized name of a unit enum variant
fn variant_name<T: Serialize>(value: T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn document_line(doc: &GradedDocument, plans: Option<&Vec<String>>) -> String {
    let meta = &doc.document.document.metadata;
    let mut line = format!(
        "  {:>6.4} {} [{}]",
        doc.document.rrf_score,
        doc.id(),
        variant_name(doc.grade.score)
    );
    if let Some(ref operator) = meta.operator {
        line.push_str(&format!(" {}", operator));
    }
    if let Some(plans) = plans {
        line.push_str(&format!(" -> {}", plans.join(", ")));
    }
    line.push('\n');
    line
}

pub fn format_outcome(outcome: &PipelineOutcome, options: &FormatOptions) -> String {
    let mut output = String::new();

    output.push_str("Queries:\n");
    for query in &outcome.queries {
        output.push_str(&format!(
            "  {} [{}] {}\n",
            query.priority,
            variant_name(query.focus),
            query.query
        ));
    }
    for rewrite in &outcome.rewrites {
        output.push_str(&format!(
            "  rewrite {}: {}\n",
            rewrite.attempt_count, rewrite.rewritten_query
        ));
    }

    let budget = &outcome.budget;
    output.push_str(&format!(
        "\nRecommendations ({} of {} relevant documents fit the budget):\n",
        budget.counts.compatible, budget.counts.total
    ));
    if budget.compatible_docs.is_empty() {
        output.push_str("  (none)\n");
    }
    for doc in &budget.compatible_docs {
        output.push_str(&document_line(doc, budget.matching_plans.get(doc.id())));
    }

    if options.all {
        if !budget.incompatible_docs.is_empty() {
            output.push_str("\nOver budget:\n");
            for doc in &budget.incompatible_docs {
                output.push_str(&document_line(doc, None));
            }
        }

        let dropped: Vec<&GradedDocument> = outcome
            .grading
            .documents
            .iter()
            .filter(|d| !d.is_relevant)
            .collect();
        if !dropped.is_empty() {
            output.push_str("\nNot relevant:\n");
            for doc in dropped {
                output.push_str(&document_line(doc, None));
            }
        }
    }

    let meta = &outcome.metadata;
    output.push_str(&format!(
        "\n{} queries, {} documents, {} relevant, {} rewrites, {} without price info\n",
        meta.query_count,
        meta.total_docs,
        meta.relevant_docs,
        meta.rewrite_count,
        budget.counts.no_price_info
    ));
    if meta.limited_results {
        output.push_str("Results are limited: few relevant documents were found.\n");
    }

    output
}

pub fn format_pricing(plans: &[PlanPricing]) -> String {
    let mut output = format!("{:<24} {:<16}", "Plan", "Operator");
    for header in BAND_HEADERS {
        output.push_str(&format!(" {:>13}", header));
    }
    output.push('\n');

    for plan in plans {
        output.push_str(&format!("{:<24} {:<16}", plan.plan_name, plan.operator));
        for price in plan.prices {
            let cell = price.map(format_brl).unwrap_or_else(|| "-".to_string());
            output.push_str(&format!(" {:>13}", cell));
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(1450.0), "R$ 1.450,00");
        assert_eq!(format_brl(320.5), "R$ 320,50");
        assert_eq!(format_brl(1234567.891), "R$ 1.234.567,89");
        assert_eq!(format_brl(0.0), "R$ 0,00");
    }

    #[test]
    fn test_format_pricing_marks_missing_bands() {
        let plans = vec![PlanPricing {
            plan_name: "Bronze".to_string(),
            operator: "Hapvida".to_string(),
            prices: [None, Some(289.9), None, None, None],
        }];
        let text = format_pricing(&plans);
        assert!(text.contains("R$ 289,90"));
        assert!(text.lines().nth(1).unwrap().contains(" -"));
    }
}
