//! Offline indexing path: walk the documents directory, chunk each file
//! into overlapping character windows, embed the chunks in batches, and
//! persist them as the fragment store the query path searches.
//!
//! This is a separate write path; the query path never mutates the store.

use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::QueryError;
use crate::index::vector::{StoredFragment, VectorStore};
use crate::llm::embeddings::EmbeddingProvider;

/// Extensions treated as indexable documents.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "rst"];

pub struct DocumentIndexer {
    embedder: Arc<dyn EmbeddingProvider>,
    config: Config,
}

impl DocumentIndexer {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: Config) -> Self {
        Self { embedder, config }
    }

    /// Build the fragment store from the configured documents directory.
    ///
    /// Refuses to clobber an existing store unless `force_rebuild` is set.
    /// Returns the number of fragments written.
    pub async fn build_index(&self, force_rebuild: bool) -> Result<usize, QueryError> {
        let store_dir = self.config.store_dir();
        if VectorStore::exists(&store_dir) && !force_rebuild {
            return Err(QueryError::Store(format!(
                "fragment store already exists at {} — pass --rebuild to replace it",
                store_dir.display()
            )));
        }

        let documents = collect_documents(&self.config.documents_dir())?;
        if documents.is_empty() {
            return Err(QueryError::Store(format!(
                "no indexable documents under {}",
                self.config.documents_dir().display()
            )));
        }
        tracing::info!("read {} documents", documents.len());

        // Chunk every document, keeping the source file in the metadata.
        let chunk_size = self.config.retrieval.chunk_size;
        let overlap = self.config.retrieval.chunk_overlap;
        let mut fragments: Vec<(String, Map<String, Value>, String)> = Vec::new();
        for (file_name, content) in &documents {
            for (i, chunk) in chunk_text(content, chunk_size, overlap).into_iter().enumerate() {
                let mut metadata = Map::new();
                metadata.insert("file_name".to_string(), Value::from(file_name.clone()));
                metadata.insert("chunk".to_string(), Value::from(i));
                fragments.push((format!("{file_name}#{i}"), metadata, chunk));
            }
        }
        tracing::info!("chunked into {} fragments", fragments.len());

        let texts: Vec<String> = fragments.iter().map(|(_, _, text)| text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != fragments.len() {
            return Err(QueryError::Embedding(format!(
                "embedding count mismatch: {} fragments, {} vectors",
                fragments.len(),
                embeddings.len()
            )));
        }

        let store = VectorStore::create(&store_dir)?;
        let stored: Vec<StoredFragment> = fragments
            .into_iter()
            .zip(embeddings)
            .map(|((id, metadata, text), embedding)| StoredFragment {
                id,
                text,
                metadata,
                embedding,
            })
            .collect();
        let count = stored.len();
        store.add_fragments(stored)?;

        tracing::info!(
            "index built: {count} fragments stored at {}",
            store_dir.display()
        );
        Ok(count)
    }
}

/// Read every text-like file under `dir`, returning (file name, content)
/// pairs in a stable order.
fn collect_documents(dir: &Path) -> Result<Vec<(String, String)>, QueryError> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry =
            entry.map_err(|e| QueryError::Store(format!("failed to walk documents dir: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| TEXT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_text {
            continue;
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| QueryError::Store(format!("failed to read {}: {e}", path.display())))?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        documents.push((file_name, content));
    }

    Ok(documents)
}

/// Split `text` into overlapping windows of `chunk_size` characters,
/// advancing by `chunk_size - overlap` each step. Windows are measured in
/// chars, never splitting a multi-byte character. Whitespace-only windows
/// are dropped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            chunks.push(window);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("", 512, 50).is_empty());
        assert!(chunk_text("   \n\n  ", 512, 50).is_empty());
    }

    #[test]
    fn test_chunk_small_text_single_chunk() {
        let chunks = chunk_text("a short document", 512, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "a short document");
    }

    #[test]
    fn test_chunk_windows_overlap() {
        let text = "abcdefghij"; // 10 chars
        let chunks = chunk_text(text, 4, 2); // step 2
        assert_eq!(chunks[0], "abcd");
        assert_eq!(chunks[1], "cdef");
        // Every adjacent pair shares the 2-char overlap
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(2).collect();
            let head: String = pair[1].chars().take(2).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_chunk_covers_entire_text() {
        let text = "0123456789";
        let chunks = chunk_text(text, 4, 1);
        assert!(chunks.last().unwrap().ends_with('9'));
    }

    #[test]
    fn test_chunk_multibyte_safe() {
        let text = "日本語のテキストです".repeat(100);
        let chunks = chunk_text(&text, 50, 10);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.chars().count() <= 50);
        }
    }

    #[test]
    fn test_chunk_overlap_ge_size_still_advances() {
        // Degenerate config must not loop forever
        let chunks = chunk_text("abcdef", 2, 5);
        assert!(chunks.len() <= 6);
    }

    #[test]
    fn test_collect_documents_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "markdown").unwrap();
        std::fs::write(dir.path().join("data.bin"), "binary").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "text").unwrap();

        let docs = collect_documents(dir.path()).unwrap();
        let names: Vec<&str> = docs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["notes.md", "readme.txt"]);
    }
}
