//! Second-stage reranking via a TEI-style `/rerank` endpoint
//! (text-embeddings-inference serving a cross-encoder model).
//!
//! One batch request scores every query-document pair; the alternative of
//! one LLM call per candidate is an order of magnitude slower. A rerank
//! failure is never fatal: the pipeline falls back to the similarity order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RerankerConfig;
use crate::models::Fragment;

/// A second-stage scorer over a candidate set.
///
/// Implementations must be infallible from the caller's perspective: any
/// internal failure degrades to returning leading candidates unchanged.
#[async_trait]
pub trait Rerank: Send + Sync {
    /// Reorder `candidates` by relevance to `question`. Output is sorted by
    /// descending score and bounded by the implementation's result budget.
    async fn rerank(&self, question: &str, candidates: Vec<Fragment>) -> Vec<Fragment>;
}

/// No-op strategy used when reranking is disabled: the similarity order
/// passes through untouched.
pub struct Passthrough;

#[async_trait]
impl Rerank for Passthrough {
    async fn rerank(&self, _question: &str, candidates: Vec<Fragment>) -> Vec<Fragment> {
        candidates
    }
}

/// Reranker backed by a remote TEI `/rerank` endpoint.
pub struct TeiReranker {
    client: reqwest::Client,
    config: RerankerConfig,
}

impl TeiReranker {
    pub fn new(client: reqwest::Client, config: RerankerConfig) -> Self {
        Self { client, config }
    }

    /// Best-effort probe of the reranker's health endpoint. A failed probe
    /// only warns; the per-call fallback is the actual safety net.
    pub async fn verify_api(&self) {
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));
        let probe = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await;

        match probe {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("reranker reachable at {}", self.config.base_url);
            }
            Ok(resp) => {
                tracing::warn!(
                    "reranker health check returned {} from {}",
                    resp.status(),
                    self.config.base_url
                );
            }
            Err(e) => {
                tracing::warn!(
                    "reranker unreachable at {}: {e} — queries will fall back to similarity order",
                    self.config.base_url
                );
            }
        }
    }

    async fn call_remote(
        &self,
        question: &str,
        candidates: &[Fragment],
    ) -> Result<Vec<RerankEntry>, String> {
        let url = format!("{}/rerank", self.config.base_url.trim_end_matches('/'));
        let texts: Vec<String> = candidates.iter().map(|f| f.text.clone()).collect();

        let req = RerankRequest {
            query: question.to_string(),
            texts,
            truncate: true,
        };

        let timeout = std::time::Duration::from_secs(self.config.timeout_secs.min(30));

        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&req)
            .send()
            .await
            .map_err(|e| format!("failed to reach reranker endpoint: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("reranker returned {status}: {body}"));
        }

        resp.json::<Vec<RerankEntry>>()
            .await
            .map_err(|e| format!("failed to parse reranker response: {e}"))
    }
}

#[async_trait]
impl Rerank for TeiReranker {
    async fn rerank(&self, question: &str, candidates: Vec<Fragment>) -> Vec<Fragment> {
        if candidates.is_empty() {
            return Vec::new();
        }

        match self.call_remote(question, &candidates).await {
            Ok(entries) => match apply_entries(&candidates, &entries, self.config.top_n) {
                Some(reranked) => {
                    tracing::info!(
                        "rerank complete: {} → {} fragments",
                        candidates.len(),
                        reranked.len()
                    );
                    reranked
                }
                None => {
                    tracing::warn!(
                        "reranker returned an out-of-range index — falling back to similarity order"
                    );
                    fallback(&candidates, self.config.top_n)
                }
            },
            Err(e) => {
                tracing::warn!("rerank failed: {e} — falling back to similarity order");
                fallback(&candidates, self.config.top_n)
            }
        }
    }
}

/// Map the endpoint's entries back onto the submitted candidates.
///
/// The endpoint returns entries sorted by descending score; the first
/// `top_n` are taken verbatim and each index resolved to a new fragment
/// carrying the updated score. An index outside the submitted batch makes
/// the whole response untrustworthy and yields `None`.
fn apply_entries(
    candidates: &[Fragment],
    entries: &[RerankEntry],
    top_n: usize,
) -> Option<Vec<Fragment>> {
    let mut reranked = Vec::with_capacity(top_n.min(entries.len()));
    for entry in entries.iter().take(top_n) {
        let fragment = candidates.get(entry.index)?;
        reranked.push(fragment.with_score(entry.score));
    }
    Some(reranked)
}

/// First `top_n` candidates in their pre-rerank order, scores untouched.
fn fallback(candidates: &[Fragment], top_n: usize) -> Vec<Fragment> {
    candidates.iter().take(top_n).cloned().collect()
}

// ─── Request/Response types ────────────────────────────

#[derive(Serialize)]
struct RerankRequest {
    query: String,
    texts: Vec<String>,
    /// Let the endpoint truncate over-long texts instead of erroring.
    truncate: bool,
}

/// TEI response item: `[{"index": 0, "score": 0.95}, ...]`, already sorted
/// by descending score.
#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn fragment(id: &str, text: &str, score: f32) -> Fragment {
        Fragment {
            id: id.to_string(),
            text: text.to_string(),
            metadata: Map::new(),
            score,
        }
    }

    fn candidates() -> Vec<Fragment> {
        vec![
            fragment("a", "RAG stands for retrieval-augmented generation", 0.8),
            fragment("b", "the weather is lovely today", 0.75),
            fragment("c", "RAG systems combine retrieval and generation", 0.78),
        ]
    }

    #[test]
    fn test_apply_entries_replaces_scores_in_response_order() {
        let entries = vec![
            RerankEntry { index: 2, score: 0.97 },
            RerankEntry { index: 0, score: 0.91 },
            RerankEntry { index: 1, score: 0.05 },
        ];
        let reranked = apply_entries(&candidates(), &entries, 2).unwrap();
        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].id, "c");
        assert_eq!(reranked[0].score, 0.97);
        assert_eq!(reranked[1].id, "a");
        assert_eq!(reranked[1].score, 0.91);
    }

    #[test]
    fn test_apply_entries_two_candidates_swapped() {
        // Endpoint prefers the second submitted candidate
        let cands = vec![
            fragment("a", "A mentions cats", 0.9),
            fragment("b", "B mentions dogs", 0.4),
        ];
        let entries = vec![
            RerankEntry { index: 1, score: 0.95 },
            RerankEntry { index: 0, score: 0.2 },
        ];
        let reranked = apply_entries(&cands, &entries, 3).unwrap();
        assert_eq!(reranked[0].id, "b");
        assert_eq!(reranked[0].score, 0.95);
        assert_eq!(reranked[1].id, "a");
        assert_eq!(reranked[1].score, 0.2);
    }

    #[test]
    fn test_apply_entries_keeps_text_and_metadata() {
        let mut meta = Map::new();
        meta.insert("file_name".to_string(), "notes.md".into());
        let cands = vec![Fragment {
            id: "x".to_string(),
            text: "content".to_string(),
            metadata: meta.clone(),
            score: 0.5,
        }];
        let entries = vec![RerankEntry { index: 0, score: 0.99 }];
        let reranked = apply_entries(&cands, &entries, 1).unwrap();
        assert_eq!(reranked[0].text, "content");
        assert_eq!(reranked[0].metadata, meta);
    }

    #[test]
    fn test_apply_entries_out_of_range_index_rejected() {
        let entries = vec![
            RerankEntry { index: 0, score: 0.9 },
            RerankEntry { index: 7, score: 0.8 },
        ];
        assert!(apply_entries(&candidates(), &entries, 3).is_none());
    }

    #[test]
    fn test_apply_entries_fewer_results_than_top_n() {
        let entries = vec![RerankEntry { index: 1, score: 0.6 }];
        let reranked = apply_entries(&candidates(), &entries, 5).unwrap();
        assert_eq!(reranked.len(), 1);
        assert_eq!(reranked[0].id, "b");
    }

    #[test]
    fn test_fallback_keeps_leading_candidates_unchanged() {
        let result = fallback(&candidates(), 2);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[0].score, 0.8);
        assert_eq!(result[1].id, "b");
        assert_eq!(result[1].score, 0.75);
    }

    #[test]
    fn test_fallback_top_n_larger_than_input() {
        let result = fallback(&candidates(), 10);
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_passthrough_returns_input_unchanged() {
        let input = candidates();
        let output = Passthrough.rerank("anything", input.clone()).await;
        assert_eq!(output.len(), input.len());
        for (a, b) in output.iter().zip(input.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.score, b.score);
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_short_circuits() {
        // Unroutable endpoint: reaching it would hang or error, an empty
        // input must return before any request is built.
        let reranker = TeiReranker::new(
            reqwest::Client::new(),
            RerankerConfig {
                enabled: true,
                base_url: "http://127.0.0.1:1".to_string(),
                top_n: 3,
                timeout_secs: 1,
            },
        );
        let result = reranker.rerank("question", Vec::new()).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        let reranker = TeiReranker::new(
            reqwest::Client::new(),
            RerankerConfig {
                enabled: true,
                base_url: "http://127.0.0.1:1".to_string(),
                top_n: 2,
                timeout_secs: 1,
            },
        );
        let result = reranker.rerank("question", candidates()).await;
        // Fallback equivalence: first top_n, original scores
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[0].score, 0.8);
        assert_eq!(result[1].id, "b");
        assert_eq!(result[1].score, 0.75);
    }
}
