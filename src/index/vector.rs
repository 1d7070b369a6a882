//! In-memory vector store with disk persistence and cosine similarity search.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::QueryError;
use crate::models::Fragment;

use super::SimilarityIndex;

/// A stored fragment with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFragment {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
}

/// The persisted fragment collection. Written once by the offline indexer,
/// read-only during queries.
#[derive(Debug)]
pub struct VectorStore {
    entries: RwLock<Vec<StoredFragment>>,
    persist_path: PathBuf,
}

const STORE_FILE: &str = "fragments.json";

impl VectorStore {
    /// Open an existing store. Fails with `IndexNotBuilt` when the store
    /// file is missing, which means the offline indexer has never run.
    pub fn open(store_dir: &Path) -> Result<Self, QueryError> {
        let persist_path = store_dir.join(STORE_FILE);
        if !persist_path.exists() {
            return Err(QueryError::IndexNotBuilt(format!(
                "no fragment store at {} — run `rag-query index` first",
                persist_path.display()
            )));
        }

        let data = std::fs::read_to_string(&persist_path)
            .map_err(|e| QueryError::Store(format!("failed to read fragment store: {e}")))?;
        let entries: Vec<StoredFragment> = serde_json::from_str(&data)
            .map_err(|e| QueryError::Store(format!("failed to parse fragment store: {e}")))?;

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path,
        })
    }

    /// Create an empty store, truncating any existing one. Used by the
    /// offline indexer.
    pub fn create(store_dir: &Path) -> Result<Self, QueryError> {
        std::fs::create_dir_all(store_dir)
            .map_err(|e| QueryError::Store(format!("failed to create store dir: {e}")))?;
        let persist_path = store_dir.join(STORE_FILE);

        let store = Self {
            entries: RwLock::new(Vec::new()),
            persist_path,
        };
        store.persist()?;
        Ok(store)
    }

    /// True if a store has been built under `store_dir`.
    pub fn exists(store_dir: &Path) -> bool {
        store_dir.join(STORE_FILE).exists()
    }

    /// Append fragments and persist. `embedding` dimensions are not checked
    /// here; mismatched vectors score 0.0 at search time.
    pub fn add_fragments(&self, fragments: Vec<StoredFragment>) -> Result<(), QueryError> {
        {
            let mut entries = self.entries.write();
            entries.extend(fragments);
        }
        self.persist()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Nearest fragments by cosine similarity, sorted descending, at most `k`.
    pub fn search_sync(&self, query_embedding: &[f32], k: usize) -> Vec<Fragment> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &StoredFragment)> = entries
            .iter()
            .map(|e| (cosine_similarity(query_embedding, &e.embedding), e))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, e)| Fragment {
                id: e.id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                score,
            })
            .collect()
    }

    /// Atomic write via temp file + rename.
    fn persist(&self) -> Result<(), QueryError> {
        let entries = self.entries.read();
        let data = serde_json::to_string(&*entries)
            .map_err(|e| QueryError::Store(format!("failed to serialize fragment store: {e}")))?;
        let tmp_path = self.persist_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &data)
            .map_err(|e| QueryError::Store(format!("failed to write fragment store: {e}")))?;
        std::fs::rename(&tmp_path, &self.persist_path)
            .map_err(|e| QueryError::Store(format!("failed to commit fragment store: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl SimilarityIndex for VectorStore {
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<Fragment>, QueryError> {
        Ok(self.search_sync(embedding, k))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: &str, text: &str, embedding: Vec<f32>) -> StoredFragment {
        StoredFragment {
            id: id.to_string(),
            text: text.to_string(),
            metadata: Map::new(),
            embedding,
        }
    }

    #[test]
    fn test_open_missing_store_is_index_not_built() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, QueryError::IndexNotBuilt(_)));
    }

    #[test]
    fn test_create_then_open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::create(dir.path()).unwrap();
        store
            .add_fragments(vec![stored("a#0", "alpha", vec![1.0, 0.0, 0.0])])
            .unwrap();

        let reopened = VectorStore::open(dir.path()).unwrap();
        assert_eq!(reopened.entry_count(), 1);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::create(dir.path()).unwrap();
        store
            .add_fragments(vec![
                stored("main#0", "server setup", vec![0.1, 0.2, 0.9]),
                stored("db#0", "database connection", vec![0.9, 0.1, 0.1]),
                stored("http#0", "http handler", vec![0.2, 0.8, 0.3]),
            ])
            .unwrap();

        // Query in the "database" direction
        let results = store.search_sync(&[0.95, 0.05, 0.05], 10);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "db#0");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::create(dir.path()).unwrap();
        let fragments: Vec<_> = (0..20)
            .map(|i| stored(&format!("f#{i}"), "text", vec![1.0, i as f32]))
            .collect();
        store.add_fragments(fragments).unwrap();

        let results = store.search_sync(&[1.0, 0.0], 5);
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let sim = cosine_similarity(&[0.3, 0.4], &[0.3, 0.4]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_mismatched_dims_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
