//! LLM relevance grading
//!
//! Candidates are graded in fixed-size batches, one model call per batch,
//! batches run one after another. Grading is fail-open: whatever goes wrong,
//! every input document comes back exactly once, and a document without a
//! usable verdict is kept as `partially_relevant`.

mod prompt;

use crate::config::GradingConfig;
use crate::llm::{complete_json, ChatMessage, LLMClient, LlmOutcome};
use crate::profile::ClientProfile;
use crate::search::{FusedDocument, SearchDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder justification for documents the model did not grade
pub const FALLBACK_REASON: &str =
    "Avaliação automática indisponível; documento mantido por precaução";

const MIN_REASON_CHARS: usize = 10;
const MAX_REASON_CHARS: usize = 300;

/// Relevance verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeScore {
    Relevant,
    PartiallyRelevant,
    Irrelevant,
}

impl GradeScore {
    /// Strict parse of the three allowed labels
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "relevant" => Some(Self::Relevant),
            "partially_relevant" => Some(Self::PartiallyRelevant),
            "irrelevant" => Some(Self::Irrelevant),
            _ => None,
        }
    }
}

/// The model's judgment for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub document_id: String,
    pub score: GradeScore,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_info: Option<Vec<String>>,
}

impl GradeResult {
    /// The static grade used whenever a verdict is unavailable
    pub fn fallback(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            score: GradeScore::PartiallyRelevant,
            reason: FALLBACK_REASON.to_string(),
            confidence: None,
            missing_info: None,
        }
    }
}

/// A fused candidate with its verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedDocument {
    pub document: FusedDocument,
    pub grade: GradeResult,
    pub is_relevant: bool,
    /// Grade came from the fail-open path
    pub fallback: bool,
}

impl GradedDocument {
    fn new(document: FusedDocument, grade: GradeResult, fallback: bool) -> Self {
        Self {
            is_relevant: grade.score != GradeScore::Irrelevant,
            document,
            grade,
            fallback,
        }
    }

    pub fn id(&self) -> &str {
        self.document.id()
    }
}

impl AsRef<SearchDocument> for GradedDocument {
    fn as_ref(&self) -> &SearchDocument {
        &self.document.document
    }
}

/// Verdict counts over a full graded set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingSummary {
    pub relevant: usize,
    pub partially_relevant: usize,
    pub irrelevant: usize,
    /// Documents graded by the fail-open path
    pub failed: usize,
}

impl GradingSummary {
    pub fn from_documents(documents: &[GradedDocument]) -> Self {
        let mut summary = Self::default();
        for doc in documents {
            match doc.grade.score {
                GradeScore::Relevant => summary.relevant += 1,
                GradeScore::PartiallyRelevant => summary.partially_relevant += 1,
                GradeScore::Irrelevant => summary.irrelevant += 1,
            }
            if doc.fallback {
                summary.failed += 1;
            }
        }
        summary
    }

    /// Documents counted as relevant downstream (relevant + partially relevant)
    pub fn kept(&self) -> usize {
        self.relevant + self.partially_relevant
    }
}

/// Full graded list plus the filtered view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingOutcome {
    /// Every input document exactly once, in input order
    pub documents: Vec<GradedDocument>,
    pub relevant_documents: Vec<GradedDocument>,
    pub summary: GradingSummary,
}

impl GradingOutcome {
    pub fn from_graded(documents: Vec<GradedDocument>, filter_irrelevant: bool) -> Self {
        let relevant_documents = if filter_irrelevant {
            documents.iter().filter(|d| d.is_relevant).cloned().collect()
        } else {
            documents.clone()
        };
        let summary = GradingSummary::from_documents(&documents);
        Self {
            documents,
            relevant_documents,
            summary,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGradeResponse {
    grades: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGrade {
    #[serde(alias = "id", alias = "document_id")]
    document_id: String,
    score: String,
    reason: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "missing_info")]
    missing_info: Option<Vec<String>>,
}

/// Validate one model entry; `None` means "treat as missing"
fn validate_grade(value: serde_json::Value) -> Option<GradeResult> {
    let raw: RawGrade = serde_json::from_value(value).ok()?;
    let score = GradeScore::parse(&raw.score)?;
    let reason = raw.reason.trim().to_string();
    let len = reason.chars().count();
    if !(MIN_REASON_CHARS..=MAX_REASON_CHARS).contains(&len) {
        return None;
    }
    Some(GradeResult {
        document_id: raw.document_id,
        score,
        reason,
        confidence: raw.confidence.filter(|c| (0.0..=1.0).contains(c)),
        missing_info: raw.missing_info,
    })
}

/// Batched LLM relevance grader
pub struct RelevanceGrader {
    client: Arc<dyn LLMClient>,
    config: GradingConfig,
    timeout: Duration,
}

impl RelevanceGrader {
    pub fn new(client: Arc<dyn LLMClient>, config: GradingConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    /// Grade every document; never fails
    pub async fn grade(
        &self,
        documents: &[FusedDocument],
        profile: &ClientProfile,
    ) -> GradingOutcome {
        let graded = self.grade_documents(documents, profile).await;
        let outcome = GradingOutcome::from_graded(graded, self.config.filter_irrelevant);

        tracing::info!(
            "Graded {} docs: {} relevant, {} partial, {} irrelevant, {} failed",
            outcome.documents.len(),
            outcome.summary.relevant,
            outcome.summary.partially_relevant,
            outcome.summary.irrelevant,
            outcome.summary.failed
        );

        outcome
    }

    /// Grade in sequential batches, preserving input order
    pub async fn grade_documents(
        &self,
        documents: &[FusedDocument],
        profile: &ClientProfile,
    ) -> Vec<GradedDocument> {
        let batch_size = self.config.batch_size.max(1);
        let mut graded = Vec::with_capacity(documents.len());

        for (idx, batch) in documents.chunks(batch_size).enumerate() {
            tracing::debug!("Grading batch {} ({} docs)", idx + 1, batch.len());
            graded.extend(self.grade_batch(batch, profile).await);
        }

        graded
    }

    async fn grade_batch(
        &self,
        batch: &[FusedDocument],
        profile: &ClientProfile,
    ) -> Vec<GradedDocument> {
        let messages = vec![
            ChatMessage::system(prompt::SYSTEM_PROMPT),
            ChatMessage::user(prompt::build_grading_prompt(batch, profile)),
        ];

        let outcome: LlmOutcome<RawGradeResponse> =
            complete_json(self.client.as_ref(), messages, self.timeout, "grading").await;

        match outcome {
            LlmOutcome::Parsed(response) => {
                let mut by_id: HashMap<String, GradeResult> = HashMap::new();
                for entry in response.grades {
                    if let Some(grade) = validate_grade(entry) {
                        // First verdict for an id wins
                        by_id.entry(grade.document_id.clone()).or_insert(grade);
                    }
                }

                batch
                    .iter()
                    .map(|doc| match by_id.remove(doc.id()) {
                        Some(grade) => GradedDocument::new(doc.clone(), grade, false),
                        None => {
                            tracing::warn!("No usable grade for {}, keeping it", doc.id());
                            GradedDocument::new(doc.clone(), GradeResult::fallback(doc.id()), true)
                        }
                    })
                    .collect()
            }
            LlmOutcome::Fallback(reason) => {
                tracing::warn!(
                    "Grading batch of {} failed ({}), keeping all as partially relevant",
                    batch.len(),
                    reason
                );
                batch
                    .iter()
                    .map(|doc| {
                        GradedDocument::new(doc.clone(), GradeResult::fallback(doc.id()), true)
                    })
                    .collect()
            }
        }
    }
}
