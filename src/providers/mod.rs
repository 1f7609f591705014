//! Upstream chat providers behind a common seam.
//!
//! The router only sees [`ChatBackend`]; the two vendor adapters live
//! in their own modules so tests can swap in scripted stubs.

pub mod gemini;
pub mod groq;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::chat::{ChatRequest, ChatResponse};

pub use gemini::GeminiBackend;
pub use groq::GroqBackend;

/// One upstream chat provider. Implementations classify every failure
/// into [`GatewayError`] at this boundary; no raw bodies escape.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Run one generation round trip.
    async fn generate(&self, req: &ChatRequest) -> Result<ChatResponse, GatewayError>;
}
