//! Retrieval layer
//!
//! Provides:
//! - The vector search backend contract and an in-memory implementation
//! - Two-phase (general → operator/product) hierarchical retrieval
//! - Multi-query Reciprocal Rank Fusion

mod fusion;
mod hierarchical;
mod memory;
mod operators;

pub use fusion::{rrf_fusion, FusedDocument, RankedList};
pub use hierarchical::{
    combine_hierarchical, into_ranked_list, HierarchicalDocument, HierarchicalRetriever,
    HierarchyLevel,
};
pub use memory::{cosine_similarity, InMemoryVectorStore, IndexedDocument};
pub use operators::{extract_operators, normalize_operator, KNOWN_OPERATORS};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of plan document, as tagged at ingestion time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Market-wide material: regulations, guides, comparisons
    General,
    /// Carrier-level material
    Operator,
    /// Individual plan/product sheets
    Product,
}

impl DocumentType {
    /// Whether a document of `doc_type` passes `filter`.
    ///
    /// Untyped documents always pass.
    pub fn admits(filter: Option<&[DocumentType]>, doc_type: Option<DocumentType>) -> bool {
        match (filter, doc_type) {
            (None, _) | (_, None) => true,
            (Some(allowed), Some(t)) => allowed.contains(&t),
        }
    }
}

/// Structured metadata attached to a stored document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub document_type: Option<DocumentType>,
    pub operator: Option<String>,
    pub plan_code: Option<String>,
    pub tags: Vec<String>,
    pub file_id: Option<String>,
}

/// A raw retrieval hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub id: String,
    pub content: String,
    /// Raw similarity reported by the backend
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl AsRef<SearchDocument> for SearchDocument {
    fn as_ref(&self) -> &SearchDocument {
        self
    }
}

/// The set of files a search may touch, supplied per invocation by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusScope {
    file_ids: HashSet<String>,
}

impl CorpusScope {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.file_ids.len()
    }

    /// A document is in scope when its file id (or, lacking one, its own id) is listed
    pub fn contains(&self, doc: &SearchDocument) -> bool {
        let key = doc.metadata.file_id.as_deref().unwrap_or(&doc.id);
        self.file_ids.contains(key)
    }
}

/// Vector search backend
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Return up to `top_k` in-scope documents closest to `embedding`,
    /// best first, restricted to `type_filter` when given.
    async fn search(
        &self,
        embedding: &[f32],
        type_filter: Option<&[DocumentType]>,
        scope: &CorpusScope,
        top_k: usize,
    ) -> Result<Vec<SearchDocument>>;
}
