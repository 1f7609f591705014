//! Wire shapes for the two upstream vendors.
//!
//! Groq speaks the OpenAI chat-completions dialect; Gemini speaks
//! `generateContent`. Both are modeled as the minimal subsets the
//! gateway actually reads, with `serde_json::Value` for open-ended
//! fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::chat::{FunctionCall, Turn};

// ============================================================================
// Groq (OpenAI chat-completions dialect)
// ============================================================================

/// A plain role/content message for the completions dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainMessage {
    pub role: String,
    pub content: String,
}

/// Request body for `POST /openai/v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionsRequest {
    pub model: String,
    pub messages: Vec<PlainMessage>,
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionsMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionsChoice {
    #[serde(default)]
    pub message: Option<CompletionsMessage>,
}

/// Error envelope shared by both vendors: `{"error": {"message": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response body for chat completions; either `choices` or `error` is
/// populated depending on the HTTP status.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionsResponse {
    #[serde(default)]
    pub choices: Vec<CompletionsChoice>,
    #[serde(default)]
    pub error: Option<UpstreamErrorBody>,
}

impl CompletionsResponse {
    /// Content of the first choice, empty string when absent.
    pub fn first_content(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .unwrap_or_default()
    }
}

// ============================================================================
// Gemini (generateContent)
// ============================================================================

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Turn>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Value>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(rename = "toolConfig", skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<Value>,
}

/// One part of a candidate's content: a text fragment or a requested
/// function call.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "functionCall")]
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub error: Option<UpstreamErrorBody>,
}

impl GenerateResponse {
    /// All text fragments of the first candidate, joined.
    pub fn text(&self) -> String {
        let mut out = String::new();
        if let Some(content) = self.candidates.first().and_then(|c| c.content.as_ref()) {
            for part in &content.parts {
                if let Some(t) = &part.text {
                    out.push_str(t);
                }
            }
        }
        out
    }

    /// Function calls requested by the first candidate, in order.
    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.function_call.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_completions_success() {
        let resp: CompletionsResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        }))
        .unwrap();
        assert_eq!(resp.first_content(), "hello");
        assert!(resp.error.is_none());
    }

    #[test]
    fn parses_completions_error_envelope() {
        let resp: CompletionsResponse = serde_json::from_value(json!({
            "error": {"message": "model overloaded"}
        }))
        .unwrap();
        assert_eq!(resp.first_content(), "");
        assert_eq!(resp.error.unwrap().message.as_deref(), Some("model overloaded"));
    }

    #[test]
    fn extracts_text_and_calls_from_candidate() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Looking that up. "},
                        {"functionCall": {"name": "findSpecialists", "args": {"query": "pathology"}}},
                        {"text": "One moment."}
                    ]
                }
            }]
        }))
        .unwrap();
        assert_eq!(resp.text(), "Looking that up. One moment.");
        let calls = resp.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "findSpecialists");
    }

    #[test]
    fn empty_candidates_degrade_to_empty() {
        let resp: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(resp.text(), "");
        assert!(resp.function_calls().is_empty());
    }
}
