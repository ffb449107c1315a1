use super::{extract_pricing, AgeBand};
use crate::profile::ClientProfile;
use crate::search::SearchDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partition counts reported alongside a budget filter pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCounts {
    pub total: usize,
    pub compatible: usize,
    pub incompatible: usize,
    /// Documents without a price for the client's band (kept as compatible)
    pub no_price_info: usize,
    /// False when age or budget was unknown and nothing was filtered
    pub filter_applied: bool,
}

/// Budget partition of a candidate list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFilterResult<T> {
    pub compatible_docs: Vec<T>,
    pub incompatible_docs: Vec<T>,
    /// Document id -> names of plans priced within budget
    pub matching_plans: BTreeMap<String, Vec<String>>,
    pub counts: BudgetCounts,
}

impl<T> Default for BudgetFilterResult<T> {
    fn default() -> Self {
        Self {
            compatible_docs: Vec::new(),
            incompatible_docs: Vec::new(),
            matching_plans: BTreeMap::new(),
            counts: BudgetCounts::default(),
        }
    }
}

enum Verdict {
    Within(Vec<String>),
    OverBudget,
    NoPriceInfo,
}

/// Keeps documents whose plans fit the client's monthly budget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetFilter {
    age: Option<u32>,
    budget: Option<f64>,
}

impl BudgetFilter {
    pub fn new(age: Option<u32>, budget: Option<f64>) -> Self {
        Self { age, budget }
    }

    pub fn from_profile(profile: &ClientProfile) -> Self {
        Self::new(profile.age, profile.budget)
    }

    /// Partition `documents`, preserving their order within each side
    pub fn filter<T>(&self, documents: &[T]) -> BudgetFilterResult<T>
    where
        T: AsRef<SearchDocument> + Clone,
    {
        let mut result = BudgetFilterResult {
            counts: BudgetCounts {
                total: documents.len(),
                ..BudgetCounts::default()
            },
            ..BudgetFilterResult::default()
        };

        let (Some(age), Some(budget)) = (self.age, self.budget.filter(|b| *b > 0.0)) else {
            tracing::info!(
                "Budget filter skipped (age or budget unknown), keeping {} documents",
                documents.len()
            );
            result.compatible_docs = documents.to_vec();
            result.counts.compatible = documents.len();
            return result;
        };

        let band = AgeBand::from_age(age);
        result.counts.filter_applied = true;

        for doc in documents {
            let search_doc = doc.as_ref();
            match Self::check(search_doc, band, budget) {
                Verdict::Within(plans) => {
                    result.matching_plans.insert(search_doc.id.clone(), plans);
                    result.compatible_docs.push(doc.clone());
                }
                Verdict::NoPriceInfo => {
                    result.counts.no_price_info += 1;
                    result.compatible_docs.push(doc.clone());
                }
                Verdict::OverBudget => {
                    tracing::debug!("Document {} is over budget for {}", search_doc.id, band);
                    result.incompatible_docs.push(doc.clone());
                }
            }
        }

        result.counts.compatible = result.compatible_docs.len();
        result.counts.incompatible = result.incompatible_docs.len();

        tracing::info!(
            "Budget filter (R$ {:.2}, {}): {} compatible, {} incompatible, {} without price info",
            budget,
            band,
            result.counts.compatible,
            result.counts.incompatible,
            result.counts.no_price_info
        );

        result
    }

    fn check(doc: &SearchDocument, band: AgeBand, budget: f64) -> Verdict {
        let Some(plans) = extract_pricing(&doc.content) else {
            return Verdict::NoPriceInfo;
        };

        let priced: Vec<_> = plans
            .iter()
            .filter_map(|plan| plan.price_for(band).map(|price| (plan, price)))
            .collect();
        if priced.is_empty() {
            return Verdict::NoPriceInfo;
        }

        let within: Vec<String> = priced
            .iter()
            .filter(|(_, price)| *price <= budget)
            .map(|(plan, _)| format!("{} ({})", plan.plan_name, plan.operator))
            .collect();

        if within.is_empty() {
            Verdict::OverBudget
        } else {
            Verdict::Within(within)
        }
    }
}
