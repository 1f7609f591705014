//! HTTP surface of the gateway.
//!
//! One decision-bearing route, `POST /api/chat`, plus a `/status`
//! probe. Responses are always a single JSON object
//! `{text?, functionCalls?, error?}`; malformed bodies are rejected
//! before any upstream call.

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;

use crate::models::chat::{ChatRequest, ChatResponse};
use crate::router::route_chat;
use crate::util::{cors_layer, AppState};

/// Build the axum router with `/api/chat` and `/status`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/api/chat", post(chat))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(preflight_no_content))
        .with_state(state)
}

/// Rewrite answered preflights to 204.
///
/// The CORS layer responds to every `OPTIONS` request itself with 200
/// before any route runs; this outer middleware maps that answer to
/// 204 No Content, keeping the headers the layer attached.
async fn preflight_no_content(req: Request, next: Next) -> Response {
    let is_options = req.method() == Method::OPTIONS;
    let mut resp = next.run(req).await;
    if is_options && resp.status() == StatusCode::OK {
        *resp.status_mut() = StatusCode::NO_CONTENT;
    }
    resp
}

/// Service status endpoint exposing configured capabilities.
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "vetgate",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": ["/status", "/api/chat"],
        "primary_configured": state.backends.primary.is_some(),
        "tool_provider_configured": state.backends.tool_capable.is_some(),
    }))
}

/// Route one chat request to an upstream provider.
///
/// The body is read raw so an unparseable or empty payload maps to 400
/// without touching any provider. An empty body is treated as `{}`,
/// which then fails the no-sendable-messages check downstream.
async fn chat(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let raw: &[u8] = if body.is_empty() { b"{}" } else { &body };
    let req: ChatRequest = match serde_json::from_slice(raw) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting unparseable chat body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ChatResponse::from_error("Invalid JSON body")),
            );
        }
    };

    let (status, resp) = route_chat(&state.backends, &req).await;
    (status, Json(resp))
}
