//! Recommend command

use crate::app::{OutputFormat, RecommendArgs};
use crate::output::{self, FormatOptions};
use anyhow::{Context, Result};
use planmatch_core::{
    ClientProfile, Config, CorpusScope, Embedder, HttpEmbedder, InMemoryVectorStore,
    RecommendationPipeline, SearchDocument, VLLMClient,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// One corpus document as stored on disk
#[derive(Deserialize)]
struct CorpusEntry {
    #[serde(flatten)]
    document: SearchDocument,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} {}", what, path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid {} {}", what, path.display()))
}

async fn build_store(
    entries: Vec<CorpusEntry>,
    embedder: &dyn Embedder,
) -> Result<InMemoryVectorStore> {
    let missing: Vec<String> = entries
        .iter()
        .filter(|e| e.embedding.is_none())
        .map(|e| e.document.content.clone())
        .collect();

    let computed = if missing.is_empty() {
        Vec::new()
    } else {
        tracing::info!("Embedding {} corpus documents", missing.len());
        embedder.embed_batch(&missing).await?
    };
    let mut computed = computed.into_iter();

    let mut store = InMemoryVectorStore::new();
    for entry in entries {
        let embedding = match entry.embedding {
            Some(embedding) => embedding,
            None => computed
                .next()
                .context("Embedder returned fewer vectors than requested")?,
        };
        store.insert(entry.document, embedding);
    }
    Ok(store)
}

pub async fn run(
    args: RecommendArgs,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let profile: ClientProfile = read_json(&args.profile, "profile")?;
    let entries: Vec<CorpusEntry> = read_json(&args.corpus, "corpus")?;

    let client = Arc::new(VLLMClient::new(config.llm_service.clone())?);
    let embedder = Arc::new(HttpEmbedder::new(client.clone()));

    let store = build_store(entries, embedder.as_ref()).await?;
    let scope = if args.files.is_empty() {
        store.scope()
    } else {
        CorpusScope::new(args.files)
    };

    let pipeline = RecommendationPipeline::new(
        client.clone(),
        embedder,
        Arc::new(store),
        config.pipeline.clone(),
    );
    let outcome = pipeline.run(&profile, &scope).await;

    let options = FormatOptions { all: args.all };
    print!("{}", output::format_outcome(&outcome, format, &options));

    if verbose {
        let metrics = client.metrics();
        eprintln!(
            "LLM requests: {} ({} cached, {:.0}% hit rate), avg latency {:.0} ms",
            metrics.total_requests,
            metrics.cache_hits,
            metrics.cache_hit_rate,
            metrics.avg_latency_ms
        );
    }

    Ok(())
}
