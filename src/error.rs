use thiserror::Error;

/// Errors surfaced by the query path.
///
/// Every variant is fatal to the query that produced it; nothing here is
/// retried internally. Rerank failures are deliberately absent: they are
/// recovered inside the reranker by falling back to the similarity order
/// and never reach the caller.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Bad caller input, correctable by the client.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The embedding provider failed or returned a malformed response.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The similarity index is empty or unreachable.
    #[error("similarity index unavailable: {0}")]
    IndexUnavailable(String),

    /// The backing store has never been built. Construction-time only;
    /// requires running the offline indexer, not a retry.
    #[error("index not built: {0}")]
    IndexNotBuilt(String),

    /// Answer synthesis (the LLM call) failed.
    #[error("answer synthesis failed: {0}")]
    Synthesis(String),

    /// Vector store persistence I/O failed.
    #[error("store error: {0}")]
    Store(String),
}
