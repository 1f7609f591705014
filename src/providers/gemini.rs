//! Gemini adapter: the tool-calling-capable provider, and the only one
//! the router may use when a request declares tools. Also the vendor
//! behind the realtime voice session (see `crate::voice`).

use async_trait::async_trait;
use serde_json::json;

use crate::error::GatewayError;
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::models::upstream::{GenerateRequest, GenerateResponse};

use super::ChatBackend;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_CHAT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Override the endpoint, for tests and regional deployments.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_body(req: &ChatRequest) -> GenerateRequest {
        let config = req.config.as_ref();
        GenerateRequest {
            contents: req.contents.clone(),
            system_instruction: config
                .and_then(|c| c.system_instruction.as_deref())
                .filter(|s| !s.is_empty())
                .map(|s| json!({ "parts": [{ "text": s }] })),
            generation_config: config
                .and_then(|c| c.temperature)
                .map(|t| json!({ "temperature": t })),
            tools: req.effective_tools().cloned(),
            tool_config: req.effective_tool_config().cloned(),
        }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, req: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        let model = req.model.as_deref().unwrap_or(GEMINI_CHAT_MODEL);
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = Self::build_body(req);

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network {
                detail: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.unwrap_or_default();
        let parsed: GenerateResponse =
            serde_json::from_slice(&bytes).unwrap_or(GenerateResponse {
                candidates: Vec::new(),
                error: None,
            });

        if !(200..300).contains(&status) {
            let detail = parsed
                .error
                .and_then(|e| match (e.message, e.status) {
                    (Some(m), _) => Some(m),
                    (None, Some(s)) => Some(s),
                    (None, None) => None,
                })
                .unwrap_or_else(|| format!("Gemini error {status}"));
            tracing::warn!(status, model, "gemini call failed");
            return Err(GatewayError::from_status(status, detail));
        }

        let calls = parsed.function_calls();
        Ok(ChatResponse {
            text: Some(parsed.text()),
            function_calls: (!calls.is_empty()).then_some(calls),
            error: None,
        })
    }
}
