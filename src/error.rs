//! Failure taxonomy and response normalization.
//!
//! Every upstream call can fail with a different shape: a structured
//! error object, a plain string, a non-JSON body, or a rate-limit
//! payload. Transport layers classify failures into the closed
//! [`GatewayError`] union at the edge; rendering matches on the tag so
//! every failure surfaces as exactly one non-empty human-readable
//! string and no raw provider payload ever reaches a user.

use thiserror::Error;

/// Fixed quota message for rate-limit failures, regardless of origin.
pub const RATE_LIMIT_MESSAGE: &str =
    "Rate limit reached. The free tier allows 5 requests per minute. \
     Please wait about a minute and try again.";

/// Fixed message for upstream auth failures (401/403).
pub const AUTH_MESSAGE: &str =
    "Invalid or missing API key. Check the configured credentials and restart the service.";

/// Fixed message for transport-level network failures.
pub const NETWORK_MESSAGE: &str =
    "Network error. Restart the local service and try again.";

/// Fixed operator instruction when no usable credential is configured.
pub const MISSING_KEY_MESSAGE: &str =
    "Missing API key. Set GROQ_API_KEY (console.groq.com) or GEMINI_API_KEY \
     (aistudio.google.com) in the environment and restart.";

/// Closed union of upstream failure modes.
///
/// Constructed by the transport layers (provider adapters, gateway
/// client, voice transport); everything downstream matches on the tag
/// instead of sniffing strings or status codes.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// HTTP 401/403 from an upstream. Never retried.
    #[error("upstream auth failure (status {status})")]
    Auth { status: u16 },

    /// HTTP 429 or a body matching the rate-limit heuristics. The only
    /// recoverable failure: the router retries once on the other
    /// provider.
    #[error("upstream rate limited: {detail}")]
    RateLimited { detail: String },

    /// The call itself could not complete (DNS, refused connection,
    /// closed socket).
    #[error("network failure: {detail}")]
    Network { detail: String },

    /// Any other non-success HTTP status.
    #[error("upstream http {status}: {detail}")]
    Http { status: u16, detail: String },

    /// A failure whose only useful content is its message.
    #[error("{message}")]
    Opaque { message: String },
}

impl GatewayError {
    /// Classify an upstream HTTP status plus best-effort body message.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 | 403 => GatewayError::Auth { status },
            429 => GatewayError::RateLimited { detail },
            _ if looks_rate_limited(&detail) => GatewayError::RateLimited { detail },
            _ => GatewayError::Http { status, detail },
        }
    }

    /// Classify an opaque message, promoting it to the network or
    /// rate-limit tag when the heuristics match.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if looks_rate_limited(&message) {
            GatewayError::RateLimited { detail: message }
        } else if looks_like_network_failure(&message) {
            GatewayError::Network { detail: message }
        } else {
            GatewayError::Opaque { message }
        }
    }

    /// True when the router may retry this failure on the fallback
    /// provider.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GatewayError::RateLimited { .. })
    }

    /// Render the single user-facing string for this failure.
    ///
    /// Rules, in order: auth failures point at credentials; rate
    /// limits collapse to the fixed quota message; network failures get
    /// the restart hint; generic HTTP failures fall back to the
    /// caller-supplied offline default rather than leaking upstream
    /// text; opaque messages pass through unless they are empty or the
    /// `[object Object]` artifact of a lossy string conversion.
    pub fn user_message(&self, offline_default: &str) -> String {
        match self {
            GatewayError::Auth { .. } => AUTH_MESSAGE.to_string(),
            GatewayError::RateLimited { .. } => RATE_LIMIT_MESSAGE.to_string(),
            GatewayError::Network { .. } => NETWORK_MESSAGE.to_string(),
            GatewayError::Http { .. } => offline_default.to_string(),
            GatewayError::Opaque { message } => {
                let msg = message.trim();
                if msg.is_empty() || msg.eq_ignore_ascii_case("[object Object]") {
                    offline_default.to_string()
                } else if looks_like_network_failure(msg) {
                    NETWORK_MESSAGE.to_string()
                } else if looks_rate_limited(msg) {
                    RATE_LIMIT_MESSAGE.to_string()
                } else {
                    msg.to_string()
                }
            }
        }
    }

    /// Message the server returns in the `{error}` envelope. Unlike
    /// [`Self::user_message`] this keeps upstream detail for HTTP
    /// failures (the browser-side client applies its own defaults);
    /// rate limits still collapse to the quota message.
    pub fn server_message(&self) -> String {
        match self {
            GatewayError::RateLimited { .. } => RATE_LIMIT_MESSAGE.to_string(),
            GatewayError::Auth { .. } => AUTH_MESSAGE.to_string(),
            GatewayError::Network { detail } => {
                if detail.trim().is_empty() {
                    NETWORK_MESSAGE.to_string()
                } else {
                    detail.trim().to_string()
                }
            }
            GatewayError::Http { status, detail } => {
                let d = detail.trim();
                if d.is_empty() {
                    format!("Upstream error {status}")
                } else {
                    d.to_string()
                }
            }
            GatewayError::Opaque { message } => {
                let msg = message.trim();
                if msg.is_empty() {
                    "Upstream request failed".to_string()
                } else {
                    msg.to_string()
                }
            }
        }
    }
}

/// Rewrite any error string that matches the rate-limit heuristics into
/// the fixed quota message; other strings pass through verbatim.
pub fn friendly(error: &str) -> String {
    if looks_rate_limited(error) {
        RATE_LIMIT_MESSAGE.to_string()
    } else {
        error.to_string()
    }
}

/// Rate-limit heuristics: "429", "RESOURCE_EXHAUSTED", "quota
/// exceeded", "rate limit" or a "retry in <digit>" phrase, all
/// case-insensitive.
pub fn looks_rate_limited(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains("429")
        || lower.contains("resource_exhausted")
        || lower.contains("quota exceeded")
        || lower.contains("rate limit")
        || has_retry_in_digit(&lower)
}

/// Network-failure heuristics over an already-extracted message.
pub fn looks_like_network_failure(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains("failed to fetch")
        || lower.contains("network error")
        || lower.contains("typeerror")
        || lower.contains("connection refused")
        || lower.contains("error sending request")
        || lower.contains("dns error")
}

fn has_retry_in_digit(lower: &str) -> bool {
    let mut rest = lower;
    while let Some(pos) = rest.find("retry in ") {
        let tail = &rest[pos + "retry in ".len()..];
        if tail.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return true;
        }
        rest = tail;
    }
    false
}

/// Extract a string from a JSON error value the way the browser client
/// does: `.message` field if object-shaped, string as-is, otherwise a
/// lossy string conversion.
pub fn error_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(obj) => match obj.get("message") {
            Some(serde_json::Value::String(s)) => s.clone(),
            // Object without a usable message: the lossy-conversion
            // artifact the normalizer knows to discard.
            _ => "[object Object]".to_string(),
        },
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
