//! Groq adapter: the primary (cheap/fast) provider. Speaks the OpenAI
//! chat-completions dialect and supports no tool calling; requests
//! that declare tools never reach this backend.

use async_trait::async_trait;

use crate::conversion::to_plain_messages;
use crate::error::GatewayError;
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::models::upstream::{CompletionsRequest, CompletionsResponse};

use super::ChatBackend;

pub const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const GROQ_CHAT_MODEL: &str = "llama-3.3-70b-versatile";

/// Temperature used when the request carries none.
const DEFAULT_TEMPERATURE: f64 = 0.5;

pub struct GroqBackend {
    http: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
}

impl GroqBackend {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            url: GROQ_CHAT_URL.to_string(),
            model: GROQ_CHAT_MODEL.to_string(),
        }
    }

    /// Override the endpoint, for tests and self-hosted gateways.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl ChatBackend for GroqBackend {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn generate(&self, req: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        let config = req.config.as_ref();
        let messages = to_plain_messages(
            &req.contents,
            config.and_then(|c| c.system_instruction.as_deref()),
        );
        if messages.is_empty() {
            return Err(GatewayError::Opaque {
                message: "No valid messages. Send at least one user message.".into(),
            });
        }

        let body = CompletionsRequest {
            model: self.model.clone(),
            messages,
            temperature: config
                .and_then(|c| c.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
        };

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network {
                detail: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.unwrap_or_default();
        let parsed: CompletionsResponse =
            serde_json::from_slice(&bytes).unwrap_or(CompletionsResponse {
                choices: Vec::new(),
                error: None,
            });

        if !(200..300).contains(&status) {
            let detail = parsed
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("Groq error {status}"));
            tracing::warn!(status, "groq call failed");
            return Err(GatewayError::from_status(status, detail));
        }

        Ok(ChatResponse::from_text(parsed.first_content()))
    }
}
