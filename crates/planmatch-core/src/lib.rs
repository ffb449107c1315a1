//! Planmatch Core Library
//!
//! Agentic retrieval pipeline that recommends health plans to a client from
//! unstructured plan documents.
//!
//! # Features
//! - LLM query planning with deterministic fallback queries
//! - Hierarchical two-phase vector retrieval (general, then carrier-specific)
//! - Multi-query fusion with Reciprocal Rank Fusion (RRF)
//! - Batched LLM relevance grading that fails open
//! - Bounded corrective query rewriting
//! - Price-table extraction and budget filtering by age band

pub mod budget;
pub mod config;
pub mod error;
pub mod grading;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod profile;
pub mod rewrite;
pub mod search;

pub use budget::{
    extract_pricing, AgeBand, BudgetCounts, BudgetFilter, BudgetFilterResult, PlanPricing,
};
pub use config::{Config, LLMServiceConfig, PipelineConfig};
pub use error::{Error, PlanMatchError, Result};
pub use grading::{
    GradeResult, GradeScore, GradedDocument, GradingOutcome, GradingSummary, RelevanceGrader,
};
pub use llm::{ChatMessage, Embedder, HttpEmbedder, LLMClient, MetricsSnapshot, VLLMClient};
pub use pipeline::{PassReport, PipelineMetadata, PipelineOutcome, RecommendationPipeline};
pub use planner::{GeneratedQuery, QueryFocus, QueryPlanner};
pub use profile::{ClientProfile, Dependent};
pub use rewrite::{QueryRewriter, RewriteContext, RewriteProblem, RewriteResult, RewriteSource};
pub use search::{
    rrf_fusion, CorpusScope, DocumentMetadata, DocumentType, FusedDocument, HierarchicalRetriever,
    InMemoryVectorStore, RankedList, SearchDocument, VectorSearch,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "planmatch";
