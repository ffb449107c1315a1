//! Recommendation pipeline
//!
//! Wires the components into one run:
//! plan → retrieve → fuse → grade → (rewrite and retry)* → budget filter.
//!
//! A run never fails. Model and retrieval problems degrade to the fallbacks
//! of each component; the rewrite loop is bounded by
//! [`RewriteConfig::max_attempts`](crate::config::RewriteConfig).

use crate::budget::{BudgetFilter, BudgetFilterResult};
use crate::config::PipelineConfig;
use crate::grading::{GradedDocument, GradingOutcome, RelevanceGrader};
use crate::llm::{Embedder, LLMClient};
use crate::planner::{sorted_queries, GeneratedQuery, QueryPlanner};
use crate::profile::ClientProfile;
use crate::rewrite::{
    detect_problem, should_rewrite, QueryRewriter, RewriteContext, RewriteProblem, RewriteResult,
};
use crate::search::{
    into_ranked_list, rrf_fusion, CorpusScope, FusedDocument, HierarchicalRetriever, RankedList,
    VectorSearch,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// What one fuse-and-grade pass saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    /// 0 for the initial pass, then one per rewrite
    pub pass: usize,
    /// Primary query on the first pass, then the latest rewrite
    pub query: String,
    pub ranked_lists: usize,
    pub fused_docs: usize,
    pub newly_graded: usize,
    pub relevant_docs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<RewriteProblem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    pub query_count: usize,
    pub rewrite_count: usize,
    pub total_docs: usize,
    pub relevant_docs: usize,
    /// Fewer relevant documents than wanted and no correction left
    pub limited_results: bool,
}

/// Result of [`RecommendationPipeline::run`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub queries: Vec<GeneratedQuery>,
    pub grading: GradingOutcome,
    pub budget: BudgetFilterResult<GradedDocument>,
    pub rewrites: Vec<RewriteResult>,
    pub passes: Vec<PassReport>,
    pub metadata: PipelineMetadata,
}

impl PipelineOutcome {
    fn empty() -> Self {
        Self {
            queries: Vec::new(),
            grading: GradingOutcome::default(),
            budget: BudgetFilterResult::default(),
            rewrites: Vec::new(),
            passes: Vec::new(),
            metadata: PipelineMetadata::default(),
        }
    }

    /// Final recommendation candidates: relevant and within budget
    pub fn recommendations(&self) -> &[GradedDocument] {
        &self.budget.compatible_docs
    }
}

/// Mean best similarity of the fused set; `None` when empty
fn average_similarity(fused: &[FusedDocument]) -> Option<f64> {
    if fused.is_empty() {
        return None;
    }
    Some(fused.iter().map(|d| d.best_similarity).sum::<f64>() / fused.len() as f64)
}

pub struct RecommendationPipeline {
    planner: QueryPlanner,
    retriever: HierarchicalRetriever,
    grader: RelevanceGrader,
    rewriter: QueryRewriter,
    config: PipelineConfig,
}

impl RecommendationPipeline {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn VectorSearch>,
        config: PipelineConfig,
    ) -> Self {
        let llm_timeout = config.llm_timeout();
        Self {
            planner: QueryPlanner::new(llm.clone(), config.planner.clone(), llm_timeout),
            retriever: HierarchicalRetriever::new(
                embedder,
                search,
                config.hierarchical.clone(),
                config.search_timeout(),
            ),
            grader: RelevanceGrader::new(llm.clone(), config.grading.clone(), llm_timeout),
            rewriter: QueryRewriter::new(llm, config.rewrite.clone(), llm_timeout),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for `profile` over the documents in `scope`
    pub async fn run(&self, profile: &ClientProfile, scope: &CorpusScope) -> PipelineOutcome {
        if scope.is_empty() {
            tracing::warn!("No documents in scope, returning empty recommendation");
            return PipelineOutcome::empty();
        }

        let start = Instant::now();
        let rewrite_config = &self.config.rewrite;

        let queries = sorted_queries(&self.planner.plan(profile).await);
        tracing::info!(
            "Running pipeline with {} queries over {} files",
            queries.len(),
            scope.len()
        );

        let mut lists: Vec<RankedList> =
            join_all(queries.iter().map(|q| self.ranked(&q.query, scope))).await;

        let mut graded: HashMap<String, GradedDocument> = HashMap::new();
        let mut passes = Vec::new();
        let mut rewrites: Vec<RewriteResult> = Vec::new();
        let mut current_query = queries.first().map(|q| q.query.clone());

        let grading = loop {
            let fused = rrf_fusion(&lists, &self.config.fusion);

            let fresh: Vec<FusedDocument> = fused
                .iter()
                .filter(|d| !graded.contains_key(d.id()))
                .cloned()
                .collect();
            let newly_graded = fresh.len();
            for doc in self.grader.grade_documents(&fresh, profile).await {
                graded.insert(doc.id().to_string(), doc);
            }

            let documents: Vec<GradedDocument> = fused
                .iter()
                .filter_map(|f| {
                    graded.get(f.id()).map(|g| {
                        let mut doc = g.clone();
                        doc.document = f.clone();
                        doc
                    })
                })
                .collect();
            let grading =
                GradingOutcome::from_graded(documents, self.config.grading.filter_irrelevant);

            let relevant = grading.relevant_documents.len();
            let avg_similarity = average_similarity(&fused);
            let mut report = PassReport {
                pass: passes.len(),
                query: current_query.clone().unwrap_or_default(),
                ranked_lists: lists.len(),
                fused_docs: fused.len(),
                newly_graded,
                relevant_docs: relevant,
                avg_similarity,
                problem: None,
            };

            tracing::info!(
                "Pass {}: {} fused, {} relevant ({} newly graded)",
                report.pass,
                report.fused_docs,
                relevant,
                newly_graded
            );

            let Some(query) = current_query.clone() else {
                passes.push(report);
                break grading;
            };
            if !should_rewrite(relevant, rewrites.len() as u32, rewrite_config) {
                passes.push(report);
                break grading;
            }

            let problem = detect_problem(fused.len(), relevant, avg_similarity, rewrite_config);
            report.problem = Some(problem);
            passes.push(report);

            let result = self
                .rewriter
                .rewrite(&RewriteContext {
                    original_query: query.clone(),
                    problem,
                    attempt_count: rewrites.len() as u32 + 1,
                    profile: profile.clone(),
                })
                .await;

            let rewritten = result.rewritten_query.clone();
            rewrites.push(result);

            if rewritten.trim().eq_ignore_ascii_case(query.trim()) {
                tracing::warn!("Rewrite produced the same query, skipping retrieval");
                continue;
            }
            lists.push(self.ranked(&rewritten, scope).await);
            current_query = Some(rewritten);
        };

        let relevant = grading.relevant_documents.len();
        let limited_results = relevant < rewrite_config.min_relevant_docs
            || rewrites.iter().any(|r| r.limited_results);

        let budget = BudgetFilter::from_profile(profile).filter(&grading.relevant_documents);

        let metadata = PipelineMetadata {
            query_count: queries.len(),
            rewrite_count: rewrites.len(),
            total_docs: grading.documents.len(),
            relevant_docs: relevant,
            limited_results,
        };

        tracing::info!(
            "Pipeline finished in {:?}: {} docs, {} relevant, {} within budget, {} rewrites{}",
            start.elapsed(),
            metadata.total_docs,
            metadata.relevant_docs,
            budget.counts.compatible,
            metadata.rewrite_count,
            if limited_results { " (limited results)" } else { "" }
        );

        PipelineOutcome {
            queries,
            grading,
            budget,
            rewrites,
            passes,
            metadata,
        }
    }

    /// Retrieve one query as a ranked list; failures yield an empty list
    async fn ranked(&self, query: &str, scope: &CorpusScope) -> RankedList {
        match self.retriever.retrieve(query, scope).await {
            Ok(documents) => into_ranked_list(query, documents),
            Err(e) => {
                tracing::warn!("Retrieval failed for '{}': {}", query, e);
                RankedList::new(query, Vec::new())
            }
        }
    }
}
