//! Text-generation collaborator for Lexiflow
//!
//! The streaming pipeline sees a language model only through the
//! [`TextGenerator`] trait: a streaming call yielding raw text deltas and a
//! non-streaming call used as fallback.

pub mod genai_client;
pub mod generator;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use genai_client::GenaiGenerator;
pub use generator::{DeltaStream, GenerationRequest, TextGenerator};
#[cfg(any(test, feature = "test-util"))]
pub use mock::ScriptedGenerator;
