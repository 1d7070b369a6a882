use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A retrieved unit of content: a chunk of source text with metadata and a
/// relevance score. Higher score means more relevant; whether the score is a
/// cosine similarity or a reranker probability depends on which stage
/// produced it.
///
/// Fragments are never mutated in place. Rescoring produces a new value with
/// the same id, text and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub text: String,
    /// Opaque to the pipeline, passed through unmodified.
    pub metadata: Map<String, Value>,
    pub score: f32,
}

impl Fragment {
    /// Copy of this fragment carrying a new relevance score.
    pub fn with_score(&self, score: f32) -> Self {
        Self {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.metadata.clone(),
            score,
        }
    }
}

/// Query request
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default = "default_true")]
    pub return_sources: bool,
    /// Overrides the configured final fragment count.
    pub top_k: Option<usize>,
}

fn default_true() -> bool {
    true
}

/// A source fragment as shown to callers: 1-based position, score, a
/// display-truncated preview of the text, and the original metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFragment {
    pub chunk_id: usize,
    pub score: f32,
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// Preview length for source text in responses.
const SOURCE_PREVIEW_CHARS: usize = 100;

impl SourceFragment {
    /// Build the caller-facing view of a fragment at 1-based position
    /// `chunk_id` in the final ranking.
    pub fn from_fragment(chunk_id: usize, fragment: &Fragment) -> Self {
        Self {
            chunk_id,
            score: fragment.score,
            text: preview(&fragment.text, SOURCE_PREVIEW_CHARS),
            metadata: fragment.metadata.clone(),
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

/// The unit returned to callers for one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceFragment>,
}
