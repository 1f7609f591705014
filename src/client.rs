//! Browser-side entry point to the gateway.
//!
//! [`GatewayClient::chat`] never fails: every transport or protocol
//! failure resolves to a valid [`ChatResponse`] whose `error` field
//! carries one normalized string, so UI code has exactly one shape to
//! render.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{error_value_to_string, friendly};
use crate::models::chat::{ChatRequest, ChatResponse, FunctionCall};

/// Anything that can answer a chat request. The tool-calling loop is
/// written against this seam so tests can script responses.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> ChatResponse;
}

/// HTTP client for the gateway's `/api/chat` endpoint.
pub struct GatewayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GatewayClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatGateway for GatewayClient {
    async fn chat(&self, req: &ChatRequest) -> ChatResponse {
        let sent = self.http.post(&self.endpoint).json(req).send().await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                let msg = e.to_string();
                let msg = if msg.trim().is_empty() {
                    "Network error. Is the gateway running?".to_string()
                } else {
                    msg
                };
                return ChatResponse::from_error(msg);
            }
        };

        let status = resp.status().as_u16();
        let body: Value = match resp.json().await {
            Ok(v) => v,
            Err(_) => {
                return ChatResponse::from_error(format!(
                    "Server error {status}. Response was not JSON."
                ));
            }
        };

        if !(200..300).contains(&status) {
            let raw = body
                .get("error")
                .map(error_value_to_string)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("Server error {status}"));
            return ChatResponse::from_error(friendly(&raw));
        }

        normalize_success_body(&body)
    }
}

/// Pull `{text, functionCalls, error?}` out of a success body, running
/// any embedded error through the rate-limit rewrite.
fn normalize_success_body(body: &Value) -> ChatResponse {
    let text = body
        .get("text")
        .and_then(|t| t.as_str())
        .map(|s| s.to_string());
    let function_calls: Option<Vec<FunctionCall>> = body
        .get("functionCalls")
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    let error = body
        .get("error")
        .filter(|v| !v.is_null())
        .map(error_value_to_string)
        .map(|s| friendly(&s));

    ChatResponse {
        text,
        function_calls,
        error,
    }
}
