use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where source documents and the vector store are kept
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration (embeddings + answer synthesis)
    pub llm: LlmConfig,
    /// Cross-encoder reranker configuration
    pub reranker: RerankerConfig,
    /// Retrieval counts and chunking parameters
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for answer synthesis
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
}

/// Configuration for the TEI-style reranker sidecar
/// (text-embeddings-inference serving a cross-encoder model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Whether reranking is applied at all. When false the pipeline keeps
    /// the similarity order.
    pub enabled: bool,
    /// Base URL for the reranker API (e.g. "http://127.0.0.1:8099").
    pub base_url: String,
    /// Number of fragments to keep after reranking.
    pub top_n: usize,
    /// Request timeout in seconds (capped at 30).
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Initial candidate count fetched from the similarity index,
    /// before any reranking. Kept larger than the final count so a
    /// reranker has a broader set to narrow.
    pub similarity_top_k: usize,
    /// Final fragment count returned to callers when the request does
    /// not override it.
    pub default_top_k: usize,
    /// Chunk window size in characters for the offline indexer.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:8000".to_string(),
            llm: LlmConfig::default(),
            reranker: RerankerConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
        }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8099".to_string(),
            top_n: 3,
            timeout_secs: 30,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: 10,
            default_top_k: 5,
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("RAG_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("RAG_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }

        // Reranker config
        if let Ok(val) = std::env::var("RERANK_ENABLED") {
            config.reranker.enabled = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Ok(url) = std::env::var("RERANK_BASE_URL") {
            config.reranker.base_url = url;
        }
        if let Ok(val) = std::env::var("RERANK_TOP_N") {
            if let Ok(v) = val.parse() {
                config.reranker.top_n = v;
            }
        }
        if let Ok(val) = std::env::var("RERANK_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.reranker.timeout_secs = v.min(30); // Cap at 30s
            }
        }

        // Retrieval config
        if let Ok(val) = std::env::var("RAG_SIMILARITY_TOP_K") {
            if let Ok(v) = val.parse() {
                config.retrieval.similarity_top_k = v;
            }
        }
        if let Ok(val) = std::env::var("RAG_DEFAULT_TOP_K") {
            if let Ok(v) = val.parse() {
                config.retrieval.default_top_k = v;
            }
        }
        if let Ok(val) = std::env::var("RAG_CHUNK_SIZE") {
            if let Ok(v) = val.parse() {
                config.retrieval.chunk_size = v;
            }
        }
        if let Ok(val) = std::env::var("RAG_CHUNK_OVERLAP") {
            if let Ok(v) = val.parse() {
                config.retrieval.chunk_overlap = v;
            }
        }

        config
    }

    /// Directory holding the source documents to index.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }

    /// Directory holding the persisted vector store.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}
