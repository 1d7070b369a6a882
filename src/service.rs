//! `QueryService`: the public entry point for one question.

use std::sync::Arc;

use crate::config::Config;
use crate::error::QueryError;
use crate::index::vector::VectorStore;
use crate::llm::embeddings::HttpEmbedder;
use crate::llm::rerank::{Passthrough, Rerank, TeiReranker};
use crate::llm::synthesize::{AnswerSynthesizer, ChatSynthesizer};
use crate::models::{QueryAnswer, SourceFragment};
use crate::pipeline::RetrievalPipeline;

/// Validates input, drives the retrieval pipeline and the answer
/// synthesizer, and assembles the response.
///
/// Once constructed the service is ready; there is no re-initialization
/// path. A missing index fails construction terminally and a fresh
/// instance must be built after running the offline indexer.
pub struct QueryService {
    pipeline: RetrievalPipeline,
    synthesizer: Arc<dyn AnswerSynthesizer>,
}

impl QueryService {
    pub fn new(pipeline: RetrievalPipeline, synthesizer: Arc<dyn AnswerSynthesizer>) -> Self {
        Self {
            pipeline,
            synthesizer,
        }
    }

    /// Wire up the production service from configuration.
    ///
    /// Fails with `IndexNotBuilt` when the fragment store does not exist
    /// yet; the caller is expected to run the offline indexer first. When
    /// reranking is enabled a best-effort health probe of the reranker is
    /// spawned; its outcome only produces log output.
    ///
    /// Must be called within a tokio runtime.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Result<Self, QueryError> {
        let store = VectorStore::open(&config.store_dir())?;
        tracing::info!("fragment store loaded: {} fragments", store.entry_count());

        let embedder = Arc::new(HttpEmbedder::new(client.clone(), config.llm.clone()));

        let reranker: Arc<dyn Rerank> = if config.reranker.enabled {
            let tei = Arc::new(TeiReranker::new(client.clone(), config.reranker.clone()));
            let probe = tei.clone();
            tokio::spawn(async move { probe.verify_api().await });
            tracing::info!(
                "reranking enabled: {} (initial={}, top_n={})",
                config.reranker.base_url,
                config.retrieval.similarity_top_k,
                config.reranker.top_n
            );
            tei
        } else {
            Arc::new(Passthrough)
        };

        let pipeline = RetrievalPipeline::new(
            embedder,
            Arc::new(store),
            reranker,
            config.retrieval.clone(),
        );

        let synthesizer = Arc::new(ChatSynthesizer::new(client, config.llm.clone()));

        Ok(Self::new(pipeline, synthesizer))
    }

    /// Answer `question` from the indexed documents.
    ///
    /// Retrieval always runs, even when `return_sources` is false — the
    /// fragments feed the synthesizer either way; only the response view
    /// omits them.
    pub async fn answer(
        &self,
        question: &str,
        return_sources: bool,
        top_k: Option<usize>,
    ) -> Result<QueryAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::InvalidQuery(
                "question must not be empty".to_string(),
            ));
        }

        tracing::info!("query: {question}");

        let fragments = self.pipeline.retrieve(question, top_k).await?;

        let answer = self.synthesizer.synthesize(question, &fragments).await?;

        let sources = if return_sources {
            fragments
                .iter()
                .enumerate()
                .map(|(i, f)| SourceFragment::from_fragment(i + 1, f))
                .collect()
        } else {
            Vec::new()
        };

        Ok(QueryAnswer {
            question: question.to_string(),
            answer,
            sources,
        })
    }
}
