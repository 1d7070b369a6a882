//! Similarity index boundary: the trait the pipeline retrieves against,
//! and the persisted cosine vector store backing it.

pub mod vector;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::models::Fragment;

/// A key-value similarity index over fragment vectors.
///
/// Given a query vector and a count `k`, returns the `k` nearest fragments
/// by the configured distance metric, each scored so that higher is closer.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<Fragment>, QueryError>;
}
