//! Forwarding `!q` questions to the external chat-completion endpoint.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub mod client;

pub use client::HttpRelay;

/// Substituted when a 200 response does not carry `choices[0].message.content`.
pub const FALLBACK_TEXT: &str = "Response not found";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay endpoint is not configured")]
    NotConfigured,
    #[error("relay returned status {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid JSON in relay response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub style: String,
}

impl CompletionRequest {
    /// A deterministic, short single-turn request.
    pub fn single_turn(model: &str, user_text: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: user_text.to_string(),
            }],
            temperature: 0.0,
            max_tokens: 150,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            style: "formal".to_string(),
        }
    }
}

/// Pull the first choice's message content out of a completion body.
pub fn extract_content(body: &Value) -> String {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_TEXT)
        .to_string()
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, user_text: &str) -> Result<String, RelayError>;
}
