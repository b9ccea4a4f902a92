//! genai-backed text generator
//!
//! One [`GenaiGenerator`] is built at process start and shared by every
//! request; the underlying genai client resolves the provider from the model
//! name and reads credentials from the provider's environment variable.

use crate::generator::{DeltaStream, GenerationRequest, TextGenerator};
use anyhow::{Error, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use genai::Client as GenaiClient;
use genai::chat::{ChatMessage as GenaiChatMessage, ChatOptions, ChatRequest, ChatStreamEvent};
use tracing::debug;

/// Text generator backed by a shared genai client
pub struct GenaiGenerator {
    /// Model to use (provider is inferred from it)
    model: String,

    /// Underlying client for the LLM
    client: GenaiClient,
}

impl GenaiGenerator {
    /// Create a generator for the given model
    pub fn new(model: &str) -> Self {
        let client = GenaiClient::builder()
            .with_chat_options(ChatOptions {
                capture_content: Some(true),
                capture_usage: Some(true),
                ..Default::default()
            })
            .build();

        GenaiGenerator {
            model: model.to_string(),
            client,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_request(request: &GenerationRequest) -> ChatRequest {
        let mut chat_req = ChatRequest::new(vec![GenaiChatMessage::user(request.prompt.clone())]);
        if let Some(system) = &request.system {
            chat_req = chat_req.with_system(system.clone());
        }
        chat_req
    }
}

#[async_trait]
impl TextGenerator for GenaiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, Error> {
        debug!("Executing chat request to model: {}", self.model);

        let response = self
            .client
            .exec_chat(&self.model, Self::chat_request(request), None)
            .await
            .map_err(|e| anyhow!("GenAI API error: {}", e))?;

        response
            .content
            .first()
            .cloned()
            .and_then(|content| content.into_text())
            .ok_or_else(|| anyhow!("No text content in chat response"))
    }

    async fn generate_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Result<DeltaStream<'a>, Error> {
        debug!("Streaming chat request to model: {}", self.model);

        let genai_stream = self
            .client
            .exec_chat_stream(&self.model, Self::chat_request(request), None)
            .await
            .map_err(|e| anyhow!("GenAI API error: {}", e))?;

        // Only content deltas matter here; reasoning and tool events are dropped
        let deltas = genai_stream.stream.filter_map(|event| async move {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => Some(Ok(chunk.content)),
                Ok(_) => None,
                Err(e) => Some(Err(anyhow!("GenAI stream error: {}", e))),
            }
        });

        Ok(Box::pin(deltas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_init() {
        let generator = GenaiGenerator::new("gemini-2.0-flash");
        assert_eq!(generator.model(), "gemini-2.0-flash");
        assert_eq!(generator.name(), "gemini-2.0-flash");
    }
}
