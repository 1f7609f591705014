//! Data structures for the gateway contract and the upstream vendors.
//!
//! - `chat`: the normalized request/response contract consumed by the
//!   browser-facing surfaces and the router.
//! - `upstream`: minimal wire subsets for the two chat providers.

pub mod chat;
pub mod upstream;
