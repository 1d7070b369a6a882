pub mod embeddings;
pub mod rerank;
pub mod synthesize;
