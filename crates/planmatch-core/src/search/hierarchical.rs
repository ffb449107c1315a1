//! Two-phase hierarchical retrieval
//!
//! Phase one searches market-wide (`general`) documents. Carriers mentioned
//! there become priority operators for phase two, which searches
//! `operator`/`product` documents and boosts those priority carriers.

use super::operators::{extract_operators, normalize_operator};
use super::{CorpusScope, DocumentType, RankedList, SearchDocument, VectorSearch};
use crate::config::HierarchicalConfig;
use crate::error::{PlanMatchError, Result};
use crate::llm::Embedder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

const GENERAL_TYPES: &[DocumentType] = &[DocumentType::General];
const SPECIFIC_TYPES: &[DocumentType] = &[DocumentType::Operator, DocumentType::Product];

/// Which phase produced a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevel {
    General,
    Specific,
}

/// A document scored by the combine step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalDocument {
    pub document: SearchDocument,
    pub hierarchical_score: f64,
    pub hierarchy_level: HierarchyLevel,
    pub operator_prioritized: bool,
}

impl HierarchicalDocument {
    pub fn id(&self) -> &str {
        &self.document.id
    }
}

/// Merge both phases into one weighted list.
///
/// General hits are inserted before specific ones and a duplicate id keeps
/// the entry inserted first, whatever its score.
pub fn combine_hierarchical(
    general: &[SearchDocument],
    specific: &[SearchDocument],
    priority_operators: &BTreeSet<String>,
    config: &HierarchicalConfig,
) -> Vec<HierarchicalDocument> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut combined = Vec::with_capacity(general.len() + specific.len());

    for doc in general {
        if !seen.insert(doc.id.as_str()) {
            continue;
        }
        combined.push(HierarchicalDocument {
            document: doc.clone(),
            hierarchical_score: doc.score * config.general_weight,
            hierarchy_level: HierarchyLevel::General,
            operator_prioritized: false,
        });
    }

    for doc in specific {
        if !seen.insert(doc.id.as_str()) {
            continue;
        }
        let prioritized = doc
            .metadata
            .operator
            .as_deref()
            .map(|op| priority_operators.contains(&normalize_operator(op)))
            .unwrap_or(false);

        let mut score = doc.score * config.specific_weight;
        if prioritized {
            score *= config.operator_boost;
        }

        combined.push(HierarchicalDocument {
            document: doc.clone(),
            hierarchical_score: score,
            hierarchy_level: HierarchyLevel::Specific,
            operator_prioritized: prioritized,
        });
    }

    combined.sort_by(|a, b| {
        b.hierarchical_score
            .partial_cmp(&a.hierarchical_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    combined
}

/// Turn combined results into a ranked list for fusion
pub fn into_ranked_list(query: &str, documents: Vec<HierarchicalDocument>) -> RankedList {
    RankedList::new(query, documents.into_iter().map(|d| d.document).collect())
}

/// Runs both retrieval phases for one query
pub struct HierarchicalRetriever {
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn VectorSearch>,
    config: HierarchicalConfig,
    timeout: Duration,
}

impl HierarchicalRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn VectorSearch>,
        config: HierarchicalConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            search,
            config,
            timeout,
        }
    }

    /// Retrieve and combine both phases for `query`.
    ///
    /// A failing phase contributes nothing; the call only errors when the
    /// query cannot be embedded or both phases fail.
    pub async fn retrieve(
        &self,
        query: &str,
        scope: &CorpusScope,
    ) -> Result<Vec<HierarchicalDocument>> {
        let embedding = match tokio::time::timeout(self.timeout, self.embedder.embed(query)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(PlanMatchError::Timeout {
                    operation: "query embedding".to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let general = self
            .phase(&embedding, GENERAL_TYPES, scope, self.config.general_top_k)
            .await;
        let priority_operators = match general {
            Ok(ref docs) => extract_operators(docs),
            Err(_) => BTreeSet::new(),
        };

        tracing::debug!(
            "Phase 1 for '{}': {} docs, priority operators {:?}",
            query,
            general.as_ref().map(Vec::len).unwrap_or(0),
            priority_operators
        );

        let specific = self
            .phase(&embedding, SPECIFIC_TYPES, scope, self.config.specific_top_k)
            .await;

        let (general, specific) = match (general, specific) {
            (Err(e1), Err(e2)) => {
                return Err(PlanMatchError::Search(format!(
                    "both retrieval phases failed: {}; {}",
                    e1, e2
                )))
            }
            (general, specific) => (general.unwrap_or_default(), specific.unwrap_or_default()),
        };

        let combined =
            combine_hierarchical(&general, &specific, &priority_operators, &self.config);

        tracing::debug!(
            "Hierarchical retrieval for '{}': {} general + {} specific -> {} combined",
            query,
            general.len(),
            specific.len(),
            combined.len()
        );

        Ok(combined)
    }

    async fn phase(
        &self,
        embedding: &[f32],
        types: &[DocumentType],
        scope: &CorpusScope,
        top_k: usize,
    ) -> Result<Vec<SearchDocument>> {
        let result = tokio::time::timeout(
            self.timeout,
            self.search.search(embedding, Some(types), scope, top_k),
        )
        .await;

        let docs = match result {
            Ok(Ok(docs)) => docs,
            Ok(Err(e)) => {
                tracing::warn!("Vector search for {:?} failed: {}", types, e);
                return Err(e);
            }
            Err(_) => {
                tracing::warn!("Vector search for {:?} timed out", types);
                return Err(PlanMatchError::Timeout {
                    operation: "vector search".to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        // Backends may ignore the type filter; enforce it, keeping untyped docs
        Ok(docs
            .into_iter()
            .filter(|d| DocumentType::admits(Some(types), d.metadata.document_type))
            .take(top_k)
            .collect())
    }
}
