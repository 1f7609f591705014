//! Provider selection and fallback policy.
//!
//! Given one request and up to two configured backends, decide which
//! upstream to call. Gemini is the only provider that supports tool
//! calling, so any request declaring tools must go there; otherwise
//! Groq is preferred (cheaper), with a single automatic retry on
//! Gemini when Groq rate-limits. The router holds no state between
//! requests.

use std::sync::Arc;

use http::StatusCode;

use crate::conversion::to_plain_messages;
use crate::error::{GatewayError, MISSING_KEY_MESSAGE};
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::providers::ChatBackend;

/// The configured upstreams. `None` means the corresponding credential
/// is absent.
#[derive(Clone, Default)]
pub struct Backends {
    /// Groq: primary, no tool calling.
    pub primary: Option<Arc<dyn ChatBackend>>,
    /// Gemini: tool calling and voice capable, fallback for the rest.
    pub tool_capable: Option<Arc<dyn ChatBackend>>,
}

/// Route one chat request to an upstream and normalize the outcome.
///
/// Returns the HTTP status and body the server should emit: 200 with
/// `{text, functionCalls?}` on success, 400 for a request that has no
/// sendable messages, 500 with `{error}` for everything else.
pub async fn route_chat(backends: &Backends, req: &ChatRequest) -> (StatusCode, ChatResponse) {
    let needs_tools = req.needs_tools();

    if let Some(gemini) = &backends.tool_capable {
        if needs_tools || backends.primary.is_none() {
            tracing::debug!(needs_tools, "routing to tool-capable provider");
            return match gemini.generate(req).await {
                Ok(resp) => (StatusCode::OK, resp),
                Err(e) => failure(e),
            };
        }
    }

    if let Some(groq) = &backends.primary {
        // needs_tools is false here: a tools request without a Gemini
        // key falls through to the configuration error below.
        if !needs_tools {
            let system = req
                .config
                .as_ref()
                .and_then(|c| c.system_instruction.as_deref());
            if to_plain_messages(&req.contents, system).is_empty() {
                return (
                    StatusCode::BAD_REQUEST,
                    ChatResponse::from_error("No valid messages. Send at least one user message."),
                );
            }

            return match groq.generate(req).await {
                Ok(resp) => (StatusCode::OK, resp),
                Err(e) if e.is_rate_limited() => match &backends.tool_capable {
                    // The only automatic retry in the system: one shot
                    // on the other provider with the original request.
                    Some(gemini) => {
                        tracing::info!("primary rate limited, retrying on fallback provider");
                        match gemini.generate(req).await {
                            Ok(resp) => (StatusCode::OK, resp),
                            Err(e2) => failure(e2),
                        }
                    }
                    None => failure(e),
                },
                Err(e) => failure(e),
            };
        }
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ChatResponse::from_error(MISSING_KEY_MESSAGE),
    )
}

fn failure(e: GatewayError) -> (StatusCode, ChatResponse) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ChatResponse::from_error(e.server_message()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RATE_LIMIT_MESSAGE;
    use crate::models::chat::Turn;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend: returns the same outcome on every call and
    /// counts invocations.
    struct Scripted {
        name: &'static str,
        outcome: Result<ChatResponse, GatewayError>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(name: &'static str, text: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome: Ok(ChatResponse::from_text(text)),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(name: &'static str, e: GatewayError) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome: Err(e),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn generate(&self, _req: &ChatRequest) -> Result<ChatResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(r) => Ok(r.clone()),
                Err(e) => Err(e.clone()),
            }
        }
    }

    fn plain_request() -> ChatRequest {
        ChatRequest {
            contents: vec![Turn::user_text("hello")],
            ..Default::default()
        }
    }

    fn tools_request() -> ChatRequest {
        ChatRequest {
            contents: vec![Turn::user_text("find a pathologist")],
            tools: Some(json!([{"functionDeclarations": []}])),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn tools_with_only_primary_is_a_config_error() {
        let groq = Scripted::ok("groq", "never");
        let backends = Backends {
            primary: Some(groq.clone()),
            tool_capable: None,
        };
        let (status, resp) = route_chat(&backends, &tools_request()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.error.as_deref(), Some(MISSING_KEY_MESSAGE));
        assert_eq!(groq.calls(), 0, "primary must not be called with tools");
    }

    #[tokio::test]
    async fn tools_with_both_keys_goes_to_tool_capable_only() {
        let groq = Scripted::ok("groq", "wrong");
        let gemini = Scripted::ok("gemini", "right");
        let backends = Backends {
            primary: Some(groq.clone()),
            tool_capable: Some(gemini.clone()),
        };
        let (status, resp) = route_chat(&backends, &tools_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.text.as_deref(), Some("right"));
        assert_eq!(groq.calls(), 0);
        assert_eq!(gemini.calls(), 1);
    }

    #[tokio::test]
    async fn plain_request_prefers_primary() {
        let groq = Scripted::ok("groq", "fast");
        let gemini = Scripted::ok("gemini", "unused");
        let backends = Backends {
            primary: Some(groq.clone()),
            tool_capable: Some(gemini.clone()),
        };
        let (status, resp) = route_chat(&backends, &plain_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.text.as_deref(), Some("fast"));
        assert_eq!(gemini.calls(), 0);
    }

    #[tokio::test]
    async fn rate_limit_without_fallback_surfaces_quota_message() {
        let groq = Scripted::err(
            "groq",
            GatewayError::RateLimited {
                detail: "429".into(),
            },
        );
        let backends = Backends {
            primary: Some(groq.clone()),
            tool_capable: None,
        };
        let (status, resp) = route_chat(&backends, &plain_request()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.error.as_deref(), Some(RATE_LIMIT_MESSAGE));
    }

    #[tokio::test]
    async fn rate_limit_with_fallback_retries_once() {
        let groq = Scripted::err(
            "groq",
            GatewayError::RateLimited {
                detail: "429".into(),
            },
        );
        let gemini = Scripted::ok("gemini", "recovered");
        let backends = Backends {
            primary: Some(groq.clone()),
            tool_capable: Some(gemini.clone()),
        };
        let (status, resp) = route_chat(&backends, &plain_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.text.as_deref(), Some("recovered"));
        assert_eq!(groq.calls(), 1);
        assert_eq!(gemini.calls(), 1);
    }

    #[tokio::test]
    async fn non_rate_limit_failure_does_not_fall_back() {
        let groq = Scripted::err(
            "groq",
            GatewayError::Http {
                status: 503,
                detail: "overloaded".into(),
            },
        );
        let gemini = Scripted::ok("gemini", "unused");
        let backends = Backends {
            primary: Some(groq.clone()),
            tool_capable: Some(gemini.clone()),
        };
        let (status, resp) = route_chat(&backends, &plain_request()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.error.as_deref(), Some("overloaded"));
        assert_eq!(gemini.calls(), 0);
    }

    #[tokio::test]
    async fn zero_sendable_messages_is_a_bad_request() {
        let groq = Scripted::ok("groq", "never");
        let backends = Backends {
            primary: Some(groq.clone()),
            tool_capable: None,
        };
        let req = ChatRequest::default();
        let (status, resp) = route_chat(&backends, &req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp.error.unwrap().contains("No valid messages"));
        assert_eq!(groq.calls(), 0);
    }

    #[tokio::test]
    async fn no_keys_at_all_is_a_config_error() {
        let backends = Backends::default();
        let (status, resp) = route_chat(&backends, &plain_request()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.error.as_deref(), Some(MISSING_KEY_MESSAGE));
    }

    #[tokio::test]
    async fn gemini_only_handles_plain_requests_too() {
        let gemini = Scripted::ok("gemini", "solo");
        let backends = Backends {
            primary: None,
            tool_capable: Some(gemini.clone()),
        };
        let (status, resp) = route_chat(&backends, &plain_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.text.as_deref(), Some("solo"));
    }
}
