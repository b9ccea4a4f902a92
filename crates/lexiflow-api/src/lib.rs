//! Lexiflow API server
//!
//! Exposes the stream producer over HTTP: each endpoint answers with a
//! chunked `application/x-ndjson` body whose records are written while the
//! model is still generating.

pub mod api;
pub mod prompts;

pub use api::{AppState, router};
