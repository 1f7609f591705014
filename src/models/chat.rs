use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Turn role enumeration for the gateway contract.
///
/// Uses lowercase serialization to match the upstream wire format:
/// "user" | "model"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One part of a conversation turn.
///
/// The wire format discriminates by key rather than by a tag field, so
/// this is an untagged union: `{"text": ...}`, `{"functionCall": ...}`
/// or `{"functionResponse": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Part::Text { text: s.into() }
    }

    /// Extractable text of this part, if it is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Correlates the call with its eventual function-response part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// The caller-supplied result of a function call, echoed back to the
/// model in a `user` turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

/// One conversation turn. Part order is significant and must be
/// preserved when resubmitting during the tool-calling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user_text(s: impl Into<String>) -> Self {
        Turn {
            role: Role::User,
            parts: vec![Part::text(s)],
        }
    }

    /// First extractable text part of this turn, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| p.as_text())
    }
}

/// Optional generation settings carried alongside the turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(
        default,
        rename = "systemInstruction",
        skip_serializing_if = "Option::is_none"
    )]
    pub system_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Declared callable functions; kept as open JSON because each
    /// provider has its own schema envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(default, rename = "toolConfig", skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<Value>,
}

/// The unit of work submitted to the router.
///
/// `tools`/`toolConfig` appear both at the top level (what the server
/// reads) and inside `config` (what the tool-capable provider
/// consumes); the client mirrors them when sending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub contents: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GenerationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(default, rename = "toolConfig", skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<Value>,
}

impl ChatRequest {
    /// True when the request declares tools and therefore requires the
    /// tool-capable provider.
    pub fn needs_tools(&self) -> bool {
        self.tools.is_some() || self.tool_config.is_some()
    }

    /// Tools merged from the top level and `config`, top level winning.
    pub fn effective_tools(&self) -> Option<&Value> {
        self.tools
            .as_ref()
            .or_else(|| self.config.as_ref().and_then(|c| c.tools.as_ref()))
    }

    pub fn effective_tool_config(&self) -> Option<&Value> {
        self.tool_config
            .as_ref()
            .or_else(|| self.config.as_ref().and_then(|c| c.tool_config.as_ref()))
    }
}

/// The unit of result returned to callers.
///
/// `error` presence is the authoritative failure signal: callers must
/// treat a response with `error` set as a failure regardless of any
/// other fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "functionCalls", skip_serializing_if = "Option::is_none")]
    pub function_calls: Option<Vec<FunctionCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        ChatResponse {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn from_error(error: impl Into<String>) -> Self {
        ChatResponse {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Requested calls, empty slice when none.
    pub fn calls(&self) -> &[FunctionCall] {
        self.function_calls.as_deref().unwrap_or_default()
    }
}
