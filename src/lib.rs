#![forbid(unsafe_code)]
#![doc = r#"
Vetgate

Chat-completion gateway for a veterinary diagnostics client portal: one
normalized request/response contract in front of two interchangeable LLM
providers, plus the realtime voice plumbing and the small persistence
periphery the portal's assistant needs.

Crate highlights
- HTTP server (in `server`): `POST /api/chat` routes each request to the
  primary (cheap, no tool-calling) or tool-capable provider with
  rate-limit fallback, and `/status` reports liveness.
- Client (in `client`): `GatewayClient` never fails — every transport,
  parse, or upstream error is normalized into the response contract.
- Tool loop (in `toolloop`): drives the function-calling protocol
  against locally registered tools until the model stops requesting
  calls.
- Voice (in `voice` + `audio`): bidirectional audio session with
  gap-free playback scheduling and a self-contained base64 codec.

Modules
- `models`: wire types for the gateway contract and both upstreams.
- `error`: the failure taxonomy and user-facing normalization rules.
- `providers`: the `ChatBackend` seam and the two vendor adapters.
- `router` / `server`: provider selection policy and the axum surface.
- `client` / `toolloop` / `specialists`: the consuming side.
- `audio` / `voice`: codec, playback scheduler, live session.
- `cache` / `collab`: appointment cache and opaque collaborator seams.
"#]

pub mod audio;
pub mod cache;
pub mod client;
pub mod collab;
pub mod conversion;
pub mod error;
pub mod models;
pub mod providers;
pub mod router;
pub mod server;
pub mod specialists;
pub mod toolloop;
pub mod util;
pub mod voice;

pub use crate::client::{ChatGateway, GatewayClient};
pub use crate::error::GatewayError;
pub use crate::models::chat::{ChatRequest, ChatResponse};
pub use crate::router::{route_chat, Backends};
