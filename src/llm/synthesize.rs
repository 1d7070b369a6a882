//! Answer synthesis: a single chat-completion call over the ordered
//! context fragments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::QueryError;
use crate::models::Fragment;

/// Produces a natural-language answer from the question and the final
/// ordered fragments.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        question: &str,
        fragments: &[Fragment],
    ) -> Result<String, QueryError>;
}

/// Chat-completion synthesizer dispatching on the configured provider.
pub struct ChatSynthesizer {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ChatSynthesizer {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl AnswerSynthesizer for ChatSynthesizer {
    async fn synthesize(
        &self,
        question: &str,
        fragments: &[Fragment],
    ) -> Result<String, QueryError> {
        let prompt = build_prompt(question, fragments);

        match self.config.provider.as_str() {
            "ollama" => call_ollama(&self.client, &self.config, &prompt).await,
            "openai" => call_openai(&self.client, &self.config, &prompt).await,
            other => Err(QueryError::Synthesis(format!(
                "unknown LLM provider: {other}"
            ))),
        }
    }
}

/// Compact prompt: all fragments in one call, retrieval order preserved.
/// The order is the model's implicit emphasis signal, so the most relevant
/// fragment comes first.
fn build_prompt(question: &str, fragments: &[Fragment]) -> String {
    let mut prompt = String::from("Context information is below.\n---------------------\n");
    for fragment in fragments {
        prompt.push_str(&fragment.text);
        prompt.push_str("\n\n");
    }
    prompt.push_str(
        "---------------------\n\
         Given the context information and not prior knowledge, \
         answer the query.\n",
    );
    prompt.push_str(&format!("Query: {question}\nAnswer: "));
    prompt
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
) -> Result<String, QueryError> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        stream: false,
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .map_err(|e| QueryError::Synthesis(format!("failed to call Ollama chat API: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(QueryError::Synthesis(format!(
            "Ollama chat API returned {status}: {body}"
        )));
    }

    let body: OllamaChatResponse = resp
        .json()
        .await
        .map_err(|e| QueryError::Synthesis(format!("failed to parse Ollama chat response: {e}")))?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
) -> Result<String, QueryError> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        temperature: 0.0,
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .map_err(|e| QueryError::Synthesis(format!("failed to call OpenAI chat API: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(QueryError::Synthesis(format!(
            "OpenAI chat API returned {status}: {body}"
        )));
    }

    let body: OpenAiChatResponse = resp
        .json()
        .await
        .map_err(|e| QueryError::Synthesis(format!("failed to parse OpenAI chat response: {e}")))?;
    Ok(body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn fragment(text: &str) -> Fragment {
        Fragment {
            id: "f".to_string(),
            text: text.to_string(),
            metadata: Map::new(),
            score: 0.5,
        }
    }

    #[test]
    fn test_prompt_preserves_fragment_order() {
        let prompt = build_prompt(
            "what is rust?",
            &[fragment("first fragment"), fragment("second fragment")],
        );
        let first = prompt.find("first fragment").unwrap();
        let second = prompt.find("second fragment").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_prompt_ends_with_question() {
        let prompt = build_prompt("what is rust?", &[fragment("ctx")]);
        assert!(prompt.contains("Query: what is rust?"));
        assert!(prompt.trim_end().ends_with("Answer:"));
    }

    #[test]
    fn test_prompt_no_fragments_still_valid() {
        let prompt = build_prompt("q", &[]);
        assert!(prompt.contains("Context information is below."));
        assert!(prompt.contains("Query: q"));
    }
}
