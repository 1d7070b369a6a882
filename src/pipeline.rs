//! The retrieve → rerank → truncate orchestration for one query.

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::QueryError;
use crate::index::SimilarityIndex;
use crate::llm::embeddings::EmbeddingProvider;
use crate::llm::rerank::Rerank;
use crate::models::Fragment;

/// Stateless per-query pipeline. Holds only long-lived, read-mostly handles
/// to its collaborators, so concurrent calls need no coordination.
pub struct RetrievalPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilarityIndex>,
    reranker: Arc<dyn Rerank>,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SimilarityIndex>,
        reranker: Arc<dyn Rerank>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            reranker,
            config,
        }
    }

    /// Retrieve the fragments supporting `question`, ordered by descending
    /// relevance, at most `top_k` (or the configured default) of them.
    ///
    /// Stages run strictly in order: embed → similarity search → rerank →
    /// truncate. Embedding and index failures are fatal to the query; a
    /// rerank failure is absorbed by the reranker itself.
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<Fragment>, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::InvalidQuery(
                "question must not be empty".to_string(),
            ));
        }
        if top_k == Some(0) {
            return Err(QueryError::InvalidQuery(
                "top_k must be a positive integer".to_string(),
            ));
        }

        let final_k = top_k.unwrap_or(self.config.default_top_k);
        // The candidate set stays at least as wide as the final count so a
        // reranker has something to narrow.
        let candidate_k = self.config.similarity_top_k.max(final_k);

        let embedding = self.embedder.embed(question).await?;

        let candidates = self.index.search(&embedding, candidate_k).await?;
        if candidates.is_empty() {
            return Err(QueryError::IndexUnavailable(
                "similarity index returned no candidates".to_string(),
            ));
        }
        tracing::debug!("retrieved {} candidates", candidates.len());

        let mut ranked = self.reranker.rerank(question, candidates).await;

        ranked.truncate(final_k);
        Ok(ranked)
    }
}
