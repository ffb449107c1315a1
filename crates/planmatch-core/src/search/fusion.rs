//! Multi-query Reciprocal Rank Fusion
//!
//! Each planned query produces its own ranked list; fusion merges them into
//! one deduplicated ordering where a document earns `1 / (k + rank + 1)` per
//! list it appears in, optionally boosted for cross-query consensus.

use super::SearchDocument;
use crate::config::FusionConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One query's results, best first
#[derive(Debug, Clone, PartialEq)]
pub struct RankedList {
    pub query: String,
    pub documents: Vec<SearchDocument>,
}

impl RankedList {
    pub fn new(query: impl Into<String>, documents: Vec<SearchDocument>) -> Self {
        Self {
            query: query.into(),
            documents,
        }
    }
}

/// A candidate after fusion, unique by document id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedDocument {
    pub document: SearchDocument,
    pub rrf_score: f64,
    /// Number of ranked lists containing the document
    pub appearances: usize,
    /// Queries whose lists contained the document, in list order
    pub query_matches: Vec<String>,
    /// Highest raw similarity the document was retrieved with
    pub best_similarity: f64,
}

impl FusedDocument {
    pub fn id(&self) -> &str {
        &self.document.id
    }
}

impl AsRef<SearchDocument> for FusedDocument {
    fn as_ref(&self) -> &SearchDocument {
        &self.document
    }
}

/// Fuse ranked lists with RRF.
///
/// Output is sorted by descending score and truncated to `config.top_k`.
/// Ties keep first-seen order, so identical inputs always give identical output.
pub fn rrf_fusion(lists: &[RankedList], config: &FusionConfig) -> Vec<FusedDocument> {
    let mut fused: Vec<FusedDocument> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for list in lists {
        let mut seen_in_list: HashSet<&str> = HashSet::new();

        for (rank, doc) in list.documents.iter().enumerate() {
            // A repeated id within one list only counts at its best rank
            if !seen_in_list.insert(doc.id.as_str()) {
                continue;
            }

            let contribution = 1.0 / (config.k + rank as f64 + 1.0);

            match index.get(&doc.id) {
                Some(&pos) => {
                    let entry = &mut fused[pos];
                    entry.rrf_score += contribution;
                    entry.appearances += 1;
                    entry.query_matches.push(list.query.clone());
                    if doc.score > entry.best_similarity {
                        entry.best_similarity = doc.score;
                    }
                }
                None => {
                    index.insert(doc.id.clone(), fused.len());
                    fused.push(FusedDocument {
                        document: doc.clone(),
                        rrf_score: contribution,
                        appearances: 1,
                        query_matches: vec![list.query.clone()],
                        best_similarity: doc.score,
                    });
                }
            }
        }
    }

    if config.multi_query_boost {
        for entry in &mut fused {
            entry.rrf_score *= 1.0 + config.boost_factor * (entry.appearances as f64 - 1.0);
        }
    }

    // sort_by is stable: equal scores keep first-seen order
    fused.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fused.truncate(config.top_k);

    tracing::debug!(
        "RRF fused {} lists into {} candidates",
        lists.len(),
        fused.len()
    );

    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::DocumentMetadata;
    use proptest::prelude::*;

    fn doc(id: &str) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            content: String::new(),
            score: 0.5,
            metadata: DocumentMetadata::default(),
        }
    }

    fn list(query: &str, ids: &[&str]) -> RankedList {
        RankedList::new(query, ids.iter().map(|id| doc(id)).collect())
    }

    fn no_boost() -> FusionConfig {
        FusionConfig {
            multi_query_boost: false,
            ..FusionConfig::default()
        }
    }

    #[test]
    fn test_single_list_scores() {
        let fused = rrf_fusion(&[list("q1", &["a", "b"])], &FusionConfig::default());
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].id(), "a");
        assert!((fused[0].rrf_score - 1.0 / 61.0).abs() < 1e-12);
        assert!((fused[1].rrf_score - 1.0 / 62.0).abs() < 1e-12);
    }

    #[test]
    fn test_consensus_outranks_single_hit() {
        let lists = vec![
            list("q1", &["solo", "shared"]),
            list("q2", &["other", "shared"]),
        ];
        let fused = rrf_fusion(&lists, &FusionConfig::default());

        assert_eq!(fused[0].id(), "shared");
        assert_eq!(fused[0].appearances, 2);
        assert_eq!(fused[0].query_matches, vec!["q1", "q2"]);
        let expected = (2.0 / 62.0) * 1.1;
        assert!((fused[0].rrf_score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_boost_disabled_is_plain_sum() {
        let lists = vec![list("q1", &["x"]), list("q2", &["x"]), list("q3", &["x"])];
        let fused = rrf_fusion(&lists, &no_boost());
        assert!((fused[0].rrf_score - 3.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn test_truncates_to_top_k() {
        let ids: Vec<String> = (0..30).map(|i| format!("d{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let fused = rrf_fusion(&[list("q", &refs)], &FusionConfig::default());
        assert_eq!(fused.len(), 15);
        assert_eq!(fused[14].id(), "d14");
    }

    #[test]
    fn test_duplicate_within_list_counts_once() {
        let fused = rrf_fusion(&[list("q", &["a", "a", "b"])], &no_boost());
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].appearances, 1);
        assert!((fused[0].rrf_score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn test_best_similarity_tracks_max() {
        let mut low = doc("a");
        low.score = 0.2;
        let mut high = doc("a");
        high.score = 0.9;
        let fused = rrf_fusion(
            &[RankedList::new("q1", vec![low]), RankedList::new("q2", vec![high])],
            &FusionConfig::default(),
        );
        assert_eq!(fused[0].best_similarity, 0.9);
    }

    #[test]
    fn test_empty_input() {
        assert!(rrf_fusion(&[], &FusionConfig::default()).is_empty());
        assert!(rrf_fusion(&[list("q", &[])], &FusionConfig::default()).is_empty());
    }

    fn arb_lists() -> impl Strategy<Value = Vec<Vec<u8>>> {
        prop::collection::vec(prop::collection::vec(0u8..20, 0..12), 0..6)
    }

    fn to_lists(raw: &[Vec<u8>]) -> Vec<RankedList> {
        raw.iter()
            .enumerate()
            .map(|(q, ids)| {
                RankedList::new(
                    format!("q{}", q),
                    ids.iter().map(|id| doc(&format!("d{}", id))).collect(),
                )
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_scores_non_increasing(raw in arb_lists()) {
            let fused = rrf_fusion(&to_lists(&raw), &FusionConfig::default());
            for pair in fused.windows(2) {
                prop_assert!(pair[0].rrf_score >= pair[1].rrf_score);
            }
        }

        #[test]
        fn prop_deterministic(raw in arb_lists()) {
            let lists = to_lists(&raw);
            let first = rrf_fusion(&lists, &FusionConfig::default());
            let second = rrf_fusion(&lists, &FusionConfig::default());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_appearances_and_score_accounting(raw in arb_lists(), boost in any::<bool>()) {
            let lists = to_lists(&raw);
            let config = FusionConfig {
                multi_query_boost: boost,
                top_k: usize::MAX,
                ..FusionConfig::default()
            };
            let fused = rrf_fusion(&lists, &config);

            for entry in &fused {
                let mut k_lists = 0usize;
                let mut sum = 0.0;
                for l in &lists {
                    if let Some(rank) = l.documents.iter().position(|d| d.id == entry.document.id) {
                        k_lists += 1;
                        sum += 1.0 / (config.k + rank as f64 + 1.0);
                    }
                }
                prop_assert_eq!(entry.appearances, k_lists);
                let expected = if boost {
                    sum * (1.0 + config.boost_factor * (k_lists as f64 - 1.0))
                } else {
                    sum
                };
                prop_assert!((entry.rrf_score - expected).abs() < 1e-9);
            }
        }
    }
}
