//! Shared bootstrap helpers: environment loading, tracing, the HTTP
//! client, and the application state handed to the axum router.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use crate::providers::{GeminiBackend, GroqBackend};
use crate::router::Backends;

/// Initialize dotenv and structured tracing based on RUST_LOG.
///
/// Looks for an explicit env file via ENV_FILE / DOTENV_PATH before the
/// conventional `.env`; missing files are fine. Safe to call more than
/// once (later subscribers are ignored).
pub fn init_tracing() {
    let mut env_source: String = "none".into();
    for key in ["ENV_FILE", "DOTENV_PATH"] {
        if let Ok(p) = std::env::var(key) {
            let p = p.trim();
            if !p.is_empty()
                && std::path::Path::new(p).is_file()
                && dotenvy::from_filename(p).is_ok()
            {
                env_source = format!("{p} ({key})");
                break;
            }
        }
    }
    if env_source == "none" && dotenvy::dotenv().is_ok() {
        env_source = ".env".into();
    }

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".into());
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::info!("Environment loaded from: {}", env_source);
}

/// Bind address for the HTTP server, default 0.0.0.0:8787.
pub fn env_bind_addr() -> String {
    std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".into())
}

/// Read an environment variable, treating empty/whitespace as absent.
pub fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build the shared HTTP client.
///
/// No request timeout is set by default — a hung upstream call is
/// bounded only by the transport. VETGATE_HTTP_TIMEOUT_SECONDS opts
/// into an overall per-request timeout.
pub fn build_http_client_from_env() -> reqwest::Client {
    let mut builder =
        reqwest::Client::builder().user_agent(format!("vetgate/{}", env!("CARGO_PKG_VERSION")));

    if let Some(secs) = non_empty_env("VETGATE_HTTP_TIMEOUT_SECONDS") {
        if let Ok(n) = secs.parse::<u64>() {
            builder = builder.timeout(std::time::Duration::from_secs(n));
        }
    }

    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

/// Permissive CORS layer: any origin, POST/OPTIONS, Content-Type.
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::Any;
    tower_http::cors::CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Shared application state used by the HTTP server and handlers.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub backends: Backends,
}

impl AppState {
    /// Assemble state from the environment. Each backend exists only
    /// when its credential is set; having neither is not fatal here —
    /// the router surfaces the configuration error per request.
    pub fn from_env() -> Self {
        let http = build_http_client_from_env();

        let primary = non_empty_env("GROQ_API_KEY")
            .map(|key| Arc::new(GroqBackend::new(http.clone(), key)) as _);
        let tool_capable = non_empty_env("GEMINI_API_KEY")
            .map(|key| Arc::new(GeminiBackend::new(http.clone(), key)) as _);

        if primary.is_none() && tool_capable.is_none() {
            tracing::warn!("no provider credentials configured; /api/chat will return errors");
        }

        AppState {
            http,
            backends: Backends {
                primary,
                tool_capable,
            },
        }
    }
}
