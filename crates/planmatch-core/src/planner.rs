//! Query planning
//!
//! Turns a client profile into a handful of diversified search queries. The
//! model proposes them; when it fails or breaks the contract, a deterministic
//! plan built from the profile takes over.

use crate::config::PlannerConfig;
use crate::llm::{complete_json, ChatMessage, LLMClient, LlmOutcome};
use crate::profile::ClientProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const MIN_QUERY_CHARS: usize = 10;
const MAX_QUERY_CHARS: usize = 500;

/// What a query concentrates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryFocus {
    Profile,
    Coverage,
    Price,
    Dependents,
    Conditions,
    General,
}

/// A planned search query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub query: String,
    pub focus: QueryFocus,
    /// 1 (most important) to 5
    pub priority: u8,
}

impl GeneratedQuery {
    fn new(query: impl Into<String>, focus: QueryFocus, priority: u8) -> Self {
        Self {
            query: query.into(),
            focus,
            priority,
        }
    }
}

/// Queries ordered by ascending priority; ties keep plan order
pub fn sorted_queries(queries: &[GeneratedQuery]) -> Vec<GeneratedQuery> {
    let mut sorted = queries.to_vec();
    sorted.sort_by_key(|q| q.priority);
    sorted
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    queries: Vec<GeneratedQuery>,
}

fn validate_plan(
    response: PlanResponse,
    config: &PlannerConfig,
) -> std::result::Result<Vec<GeneratedQuery>, String> {
    let count = response.queries.len();
    if count < config.min_queries || count > config.max_queries {
        return Err(format!(
            "expected {}-{} queries, got {}",
            config.min_queries, config.max_queries, count
        ));
    }

    let mut seen = HashSet::new();
    let mut queries = Vec::with_capacity(count);
    for mut q in response.queries {
        q.query = q.query.trim().to_string();
        let len = q.query.chars().count();
        if !(MIN_QUERY_CHARS..=MAX_QUERY_CHARS).contains(&len) {
            return Err(format!("query length {} out of range", len));
        }
        if !(1..=5).contains(&q.priority) {
            return Err(format!("priority {} out of range", q.priority));
        }
        if !seen.insert(q.query.to_lowercase()) {
            return Err(format!("duplicate query '{}'", q.query));
        }
        queries.push(q);
    }
    Ok(queries)
}

/// Deterministic plan used whenever the model cannot be trusted
pub fn fallback_queries(profile: &ClientProfile, config: &PlannerConfig) -> Vec<GeneratedQuery> {
    let mut queries = Vec::new();

    let mut profile_query = "plano de saúde individual".to_string();
    if let Some(age) = profile.age {
        profile_query.push_str(&format!(" para pessoa de {} anos", age));
    }
    if let Some(location) = profile.location() {
        profile_query.push_str(&format!(" em {}", location));
    }
    queries.push(GeneratedQuery::new(profile_query, QueryFocus::Profile, 1));

    queries.push(GeneratedQuery::new(
        "cobertura de plano de saúde com consultas, exames, internação e rede credenciada",
        QueryFocus::Coverage,
        3,
    ));

    if let Some(budget) = profile.budget {
        queries.push(GeneratedQuery::new(
            format!("plano de saúde com mensalidade até R$ {:.0}", budget),
            QueryFocus::Price,
            2,
        ));
    }

    if profile.has_dependents() {
        let query = if profile.has_minor_dependents() {
            "plano de saúde familiar com cobertura pediátrica para dependentes menores de 18 anos"
        } else {
            "plano de saúde familiar com inclusão de dependentes adultos"
        };
        queries.push(GeneratedQuery::new(query, QueryFocus::Dependents, 2));
    }

    if !profile.conditions.is_empty() {
        queries.push(GeneratedQuery::new(
            format!(
                "plano de saúde com cobertura para {} e doenças preexistentes",
                profile.conditions.join(", ")
            ),
            QueryFocus::Conditions,
            3,
        ));
    }

    const CATCH_ALL: &[&str] = &[
        "comparativo de planos de saúde e operadoras disponíveis",
        "melhores planos de saúde com bom custo-benefício",
        "guia para escolher plano de saúde individual ou familiar",
    ];
    let mut padding = CATCH_ALL.iter();
    while queries.len() < config.min_queries {
        match padding.next() {
            Some(q) => queries.push(GeneratedQuery::new(*q, QueryFocus::General, 4)),
            None => break,
        }
    }

    queries.truncate(config.max_queries);
    queries
}

/// LLM-backed query planner
pub struct QueryPlanner {
    client: Arc<dyn LLMClient>,
    config: PlannerConfig,
    timeout: Duration,
}

impl QueryPlanner {
    pub fn new(client: Arc<dyn LLMClient>, config: PlannerConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    /// Plan queries for `profile`; never fails
    pub async fn plan(&self, profile: &ClientProfile) -> Vec<GeneratedQuery> {
        let messages = vec![
            ChatMessage::system(
                "Você é especialista em planos de saúde no Brasil e gera consultas de busca \
                 para um índice de documentos de planos. Responda SOMENTE com JSON válido.",
            ),
            ChatMessage::user(build_planning_prompt(profile, &self.config)),
        ];

        let outcome: LlmOutcome<PlanResponse> =
            complete_json(self.client.as_ref(), messages, self.timeout, "query planning").await;

        match outcome.validate(|response| validate_plan(response, &self.config)) {
            LlmOutcome::Parsed(queries) => {
                tracing::info!("Planned {} queries via LLM", queries.len());
                queries
            }
            LlmOutcome::Fallback(reason) => {
                let queries = fallback_queries(profile, &self.config);
                tracing::warn!(
                    "Query planning fell back ({}), using {} deterministic queries",
                    reason,
                    queries.len()
                );
                queries
            }
        }
    }
}

fn build_planning_prompt(profile: &ClientProfile, config: &PlannerConfig) -> String {
    format!(
        r#"Gere de {min} a {max} consultas de busca diferentes para encontrar planos de saúde adequados a este cliente:

{profile}

Regras:
- Cada consulta com 10 a 500 caracteres
- Use focos diferentes sempre que possível: "profile", "coverage", "price", "dependents", "conditions", "general"
- Só use "price" se houver orçamento; só use "conditions" se houver condições de saúde
- priority de 1 (mais importante) a 5

Formato:
{{"queries": [{{"query": "...", "focus": "profile", "priority": 1}}]}}

JSON:"#,
        min = config.min_queries,
        max = config.max_queries,
        profile = profile.prompt_summary()
    )
}
