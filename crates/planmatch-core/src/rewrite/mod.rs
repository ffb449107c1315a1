//! Corrective query rewriting
//!
//! When grading leaves too few relevant documents the pipeline diagnoses why
//! ([`detect_problem`]) and reformulates the query. Attempts are bounded: past
//! the configured maximum the rewriter returns the original query untouched
//! without calling the model, which is what guarantees the loop terminates.

mod fallback;

use crate::config::RewriteConfig;
use crate::llm::{complete_json, ChatMessage, LLMClient, LlmOutcome};
use crate::profile::ClientProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Why retrieval under-performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteProblem {
    NoResults,
    LowSimilarity,
    TooSpecific,
    MissingContext,
}

impl RewriteProblem {
    /// Reformulation guidance given to the model for this problem
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::NoResults => {
                "A busca não retornou nenhum documento. Generalize a consulta: remova termos \
                 restritivos e palavras vazias, mantendo apenas o essencial sobre planos de saúde."
            }
            Self::LowSimilarity => {
                "Os documentos encontrados são pouco parecidos com a consulta. Reescreva usando o \
                 vocabulário dos documentos de planos (mensalidade, rede credenciada, coparticipação, \
                 acomodação, rol da ANS) e sinônimos do domínio."
            }
            Self::TooSpecific => {
                "A consulta é específica demais e trouxe poucos documentos relevantes. Remova \
                 códigos de plano, números de registro e nomes muito específicos, mantendo a intenção."
            }
            Self::MissingContext => {
                "Faltou contexto do cliente. Acrescente localização, faixa etária e composição \
                 familiar para direcionar a busca."
            }
        }
    }
}

/// Classify a retrieval pass. Total over all inputs.
pub fn detect_problem(
    total_results: usize,
    relevant_results: usize,
    avg_similarity: Option<f64>,
    config: &RewriteConfig,
) -> RewriteProblem {
    if total_results == 0 {
        return RewriteProblem::NoResults;
    }
    if relevant_results < config.min_relevant_docs {
        return match avg_similarity {
            Some(avg) if avg < config.low_similarity_threshold => RewriteProblem::LowSimilarity,
            _ => RewriteProblem::TooSpecific,
        };
    }
    RewriteProblem::MissingContext
}

/// Whether another corrective attempt is allowed.
///
/// `attempt_count` is the number of rewrites already performed.
pub fn should_rewrite(relevant_count: usize, attempt_count: u32, config: &RewriteConfig) -> bool {
    relevant_count < config.min_relevant_docs && attempt_count < config.max_attempts
}

/// Inputs of one rewrite attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteContext {
    pub original_query: String,
    pub problem: RewriteProblem,
    /// 1-based attempt number; monotonically increasing for one logical query
    pub attempt_count: u32,
    pub profile: ClientProfile,
}

/// Who produced the rewritten query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteSource {
    Llm,
    Fallback,
    /// Attempts exhausted; query returned unchanged
    HardStop,
}

/// Outcome of one rewrite attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResult {
    pub original_query: String,
    pub rewritten_query: String,
    pub problem: RewriteProblem,
    pub attempt_count: u32,
    /// Results will stay limited: no further correction is possible
    pub limited_results: bool,
    pub source: RewriteSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewriteResponse {
    #[serde(alias = "rewritten_query", alias = "query")]
    rewritten_query: String,
    #[serde(default)]
    reasoning: Option<String>,
}

/// LLM-backed query rewriter with a deterministic fallback
pub struct QueryRewriter {
    client: Arc<dyn LLMClient>,
    config: RewriteConfig,
    timeout: Duration,
}

impl QueryRewriter {
    pub fn new(client: Arc<dyn LLMClient>, config: RewriteConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite `ctx.original_query`; never fails
    pub async fn rewrite(&self, ctx: &RewriteContext) -> RewriteResult {
        if ctx.attempt_count > self.config.max_attempts {
            tracing::warn!(
                "Rewrite attempt {} exceeds max {}, returning original query",
                ctx.attempt_count,
                self.config.max_attempts
            );
            return RewriteResult {
                original_query: ctx.original_query.clone(),
                rewritten_query: ctx.original_query.clone(),
                problem: ctx.problem,
                attempt_count: ctx.attempt_count,
                limited_results: true,
                source: RewriteSource::HardStop,
                reasoning: None,
            };
        }

        let messages = vec![
            ChatMessage::system(
                "Você reescreve consultas de busca sobre planos de saúde para melhorar a \
                 recuperação de documentos. Responda SOMENTE com JSON válido.",
            ),
            ChatMessage::user(build_rewrite_prompt(ctx)),
        ];

        let outcome: LlmOutcome<RewriteResponse> =
            complete_json(self.client.as_ref(), messages, self.timeout, "query rewrite").await;

        let outcome = outcome.validate(|response| {
            let rewritten = response.rewritten_query.trim().to_string();
            if rewritten.chars().count() < fallback::MIN_QUERY_CHARS {
                return Err(format!("rewritten query too short: '{}'", rewritten));
            }
            Ok((rewritten, response.reasoning))
        });

        match outcome {
            LlmOutcome::Parsed((rewritten, reasoning)) => {
                if rewritten.eq_ignore_ascii_case(ctx.original_query.trim()) {
                    tracing::warn!("LLM rewrite returned the query unchanged");
                }
                tracing::info!(
                    "Rewrote query ({:?}, attempt {}): '{}' -> '{}'",
                    ctx.problem,
                    ctx.attempt_count,
                    ctx.original_query,
                    rewritten
                );
                RewriteResult {
                    original_query: ctx.original_query.clone(),
                    rewritten_query: rewritten,
                    problem: ctx.problem,
                    attempt_count: ctx.attempt_count,
                    limited_results: false,
                    source: RewriteSource::Llm,
                    reasoning,
                }
            }
            LlmOutcome::Fallback(reason) => {
                let rewritten =
                    fallback::fallback_rewrite(ctx.problem, &ctx.original_query, &ctx.profile);
                tracing::warn!(
                    "Query rewrite fell back ({}): '{}' -> '{}'",
                    reason,
                    ctx.original_query,
                    rewritten
                );
                RewriteResult {
                    original_query: ctx.original_query.clone(),
                    rewritten_query: rewritten,
                    problem: ctx.problem,
                    attempt_count: ctx.attempt_count,
                    limited_results: ctx.attempt_count >= self.config.max_attempts,
                    source: RewriteSource::Fallback,
                    reasoning: None,
                }
            }
        }
    }
}

fn build_rewrite_prompt(ctx: &RewriteContext) -> String {
    format!(
        r#"Consulta original: "{query}"

Perfil do cliente:
{profile}

Problema detectado: {problem:?}
Estratégia: {strategy}

Tentativa {attempt}. A nova consulta deve ter pelo menos 10 caracteres e ser diferente da original.

Formato:
{{"rewrittenQuery": "...", "reasoning": "..."}}

JSON:"#,
        query = ctx.original_query,
        profile = ctx.profile.prompt_summary(),
        problem = ctx.problem,
        strategy = ctx.problem.strategy(),
        attempt = ctx.attempt_count,
    )
}
