//! Pipeline tunables
//!
//! Every knob of the retrieval pipeline lives here and is passed explicitly
//! into each component, so a run never reads global state.

use crate::error::{PlanMatchError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub planner: PlannerConfig,
    pub hierarchical: HierarchicalConfig,
    pub fusion: FusionConfig,
    pub grading: GradingConfig,
    pub rewrite: RewriteConfig,
    /// Per-call timeout for LLM completions
    pub llm_timeout_secs: u64,
    /// Per-call timeout for embedding + vector search
    pub search_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            hierarchical: HierarchicalConfig::default(),
            fusion: FusionConfig::default(),
            grading: GradingConfig::default(),
            rewrite: RewriteConfig::default(),
            llm_timeout_secs: 15,
            search_timeout_secs: 10,
        }
    }
}

impl PipelineConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Reject settings that would make the pipeline degenerate
    pub fn validate(&self) -> Result<()> {
        if self.grading.batch_size == 0 {
            return Err(PlanMatchError::Config(
                "grading.batch_size must be at least 1".to_string(),
            ));
        }
        if self.planner.min_queries == 0 || self.planner.min_queries > self.planner.max_queries {
            return Err(PlanMatchError::Config(format!(
                "planner query bounds invalid: min={} max={}",
                self.planner.min_queries, self.planner.max_queries
            )));
        }
        if self.fusion.k < 0.0 {
            return Err(PlanMatchError::Config("fusion.k must be >= 0".to_string()));
        }
        if self.fusion.top_k == 0 {
            return Err(PlanMatchError::Config(
                "fusion.top_k must be at least 1".to_string(),
            ));
        }
        if self.llm_timeout_secs == 0 || self.search_timeout_secs == 0 {
            return Err(PlanMatchError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Query planner bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub min_queries: usize,
    pub max_queries: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_queries: 3,
            max_queries: 5,
        }
    }
}

/// Two-phase retrieval weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalConfig {
    /// Results from the general-scope pass
    pub general_top_k: usize,
    /// Results from the operator/product pass
    pub specific_top_k: usize,
    pub general_weight: f64,
    pub specific_weight: f64,
    /// Multiplier for specific docs whose operator was seen in phase one
    pub operator_boost: f64,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            general_top_k: 5,
            specific_top_k: 10,
            general_weight: 0.3,
            specific_weight: 0.7,
            operator_boost: 1.2,
        }
    }
}

/// Reciprocal Rank Fusion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// RRF smoothing constant
    pub k: f64,
    /// Maximum fused documents kept
    pub top_k: usize,
    pub multi_query_boost: bool,
    pub boost_factor: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            k: 60.0,
            top_k: 15,
            multi_query_boost: true,
            boost_factor: 0.1,
        }
    }
}

/// Relevance grading settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Documents per LLM call
    pub batch_size: usize,
    /// Exclude irrelevant docs from the relevant view
    pub filter_irrelevant: bool,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            filter_irrelevant: true,
        }
    }
}

/// Corrective rewrite loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub max_attempts: u32,
    pub min_relevant_docs: usize,
    /// Average similarity under which retrieval counts as off-target
    pub low_similarity_threshold: f64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            min_relevant_docs: 3,
            low_similarity_threshold: 0.5,
        }
    }
}
