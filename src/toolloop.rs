//! The function-calling protocol, client side.
//!
//! The model may answer a request with one or more requested function
//! calls. This loop executes the first requested call against a local
//! tool, appends the call and its result to the conversation in wire
//! order, and resubmits until the model stops requesting calls.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::client::ChatGateway;
use crate::models::chat::{
    ChatRequest, FunctionResponse, GenerationConfig, Part, Role, Turn,
};

/// A locally executable function the model may request.
pub trait LocalTool: Send + Sync {
    /// Name matched against the model's requested call.
    fn name(&self) -> &str;

    /// Key wrapping the result in the function-response payload, e.g.
    /// "specialists" for `{"specialists": [...]}`.
    fn response_key(&self) -> &str;

    /// Execute the call synchronously with the model-supplied args.
    fn call(&self, args: &Map<String, Value>) -> Value;
}

/// Named lookup of local tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn LocalTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: Box<dyn LocalTool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn LocalTool> {
        self.tools.get(name).map(|t| t.as_ref())
    }
}

/// Drive a conversation to completion, resolving function calls along
/// the way, and return the assistant's reply text.
///
/// Only the first entry of each `functionCalls` batch is honored; the
/// tool-config policy shipped with the requests restricts the model to
/// a single allowed function, so parallel calls are out of contract.
/// Any failure — a gateway error, an unknown tool — terminates the
/// loop and becomes the reply. A final response with neither text nor
/// error yields `offline_default`.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: Option<String>,
    mut contents: Vec<Turn>,
    config: GenerationConfig,
    registry: &ToolRegistry,
    offline_default: &str,
) -> String {
    let request = |contents: Vec<Turn>| ChatRequest {
        model: model.clone(),
        contents,
        config: Some(config.clone()),
        tools: config.tools.clone(),
        tool_config: config.tool_config.clone(),
    };

    let mut result = gateway.chat(&request(contents.clone())).await;

    loop {
        if let Some(err) = &result.error {
            return err.clone();
        }
        let Some(call) = result.calls().first().cloned() else {
            break;
        };

        let Some(tool) = registry.get(&call.name) else {
            tracing::warn!(tool = %call.name, "model requested unknown tool");
            return offline_default.to_string();
        };
        let value = tool.call(&call.args);

        // Wire order matters: the function-response must follow its
        // function-call in the same relative position.
        contents.push(Turn {
            role: Role::Model,
            parts: vec![Part::FunctionCall {
                function_call: call.clone(),
            }],
        });
        contents.push(Turn {
            role: Role::User,
            parts: vec![Part::FunctionResponse {
                function_response: FunctionResponse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    response: serde_json::json!({ tool.response_key(): value }),
                },
            }],
        });

        result = gateway.chat(&request(contents.clone())).await;
    }

    match result.text {
        Some(text) if !text.is_empty() => text,
        _ => offline_default.to_string(),
    }
}
