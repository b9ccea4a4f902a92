//! The text-generation collaborator seen by the streaming pipeline

use anyhow::Error;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A stream of raw text deltas from a model
pub type DeltaStream<'a> = Pin<Box<dyn Stream<Item = Result<String, Error>> + Send + 'a>>;

/// One generation request: an optional system prompt and the user prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A service that turns a prompt into text, either all at once or as deltas
///
/// Implementations are constructed once per process and shared behind an
/// `Arc`; they must not keep per-request mutable state.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Label used in logs
    fn name(&self) -> &str;

    /// Generate the complete response in one call
    async fn generate(&self, request: &GenerationRequest) -> Result<String, Error>;

    /// Generate the response as a stream of text deltas
    async fn generate_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Result<DeltaStream<'a>, Error>;
}
