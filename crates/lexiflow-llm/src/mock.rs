//! Scripted text generator, test builds only (`test-util` feature)
//!
//! Replays a fixed list of deltas and can be told to fail when the stream is
//! opened, after a number of deltas, or on the non-streaming call.

use crate::generator::{DeltaStream, GenerationRequest, TextGenerator};
use anyhow::{Error, anyhow};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Where the scripted stream breaks
#[derive(Debug, Clone)]
enum StreamFailure {
    /// `generate_stream` itself returns an error
    OnOpen(String),
    /// The stream yields `count` deltas, then an error item
    AfterDeltas { count: usize, message: String },
}

/// A [`TextGenerator`] that replays canned output
pub struct ScriptedGenerator {
    deltas: Vec<String>,
    failure: Option<StreamFailure>,
    completion: Result<String, String>,
    delay: Option<Duration>,
    stream_calls: AtomicUsize,
    completion_calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl ScriptedGenerator {
    /// Replay `deltas` in order; the non-streaming call returns their concatenation
    pub fn new<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let deltas: Vec<String> = deltas.into_iter().map(Into::into).collect();
        let completion = Ok(deltas.concat());
        Self {
            deltas,
            failure: None,
            completion,
            delay: None,
            stream_calls: AtomicUsize::new(0),
            completion_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Split `text` into deltas of at most `chunk_chars` characters
    pub fn chunked(text: &str, chunk_chars: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let deltas = chars
            .chunks(chunk_chars.max(1))
            .map(|c| c.iter().collect::<String>());
        Self::new(deltas)
    }

    /// Make `generate_stream` fail before yielding anything
    pub fn fail_on_open(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(StreamFailure::OnOpen(message.into()));
        self
    }

    /// Yield `count` deltas, then a stream error
    pub fn fail_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.failure = Some(StreamFailure::AfterDeltas {
            count,
            message: message.into(),
        });
        self
    }

    /// Set what the non-streaming call returns
    pub fn with_completion(mut self, text: impl Into<String>) -> Self {
        self.completion = Ok(text.into());
        self
    }

    /// Make the non-streaming call fail
    pub fn fail_completion(mut self, message: impl Into<String>) -> Self {
        self.completion = Err(message.into());
        self
    }

    /// Sleep between deltas
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    /// The most recent request seen by either call
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }

    fn record_request(&self, request: &GenerationRequest) {
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(request.clone());
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, Error> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.record_request(request);
        self.completion.clone().map_err(|message| anyhow!(message))
    }

    async fn generate_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Result<DeltaStream<'a>, Error> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.record_request(request);

        let mut items: Vec<Result<String, Error>> = Vec::new();
        match &self.failure {
            Some(StreamFailure::OnOpen(message)) => return Err(anyhow!(message.clone())),
            Some(StreamFailure::AfterDeltas { count, message }) => {
                items.extend(self.deltas.iter().take(*count).cloned().map(Ok));
                items.push(Err(anyhow!(message.clone())));
            }
            None => items.extend(self.deltas.iter().cloned().map(Ok)),
        }

        let delay = self.delay;
        let deltas = stream::iter(items).then(move |item| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            item
        });

        Ok(Box::pin(deltas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(generator: &ScriptedGenerator) -> Vec<Result<String, String>> {
        let request = GenerationRequest::new("prompt");
        let stream = generator.generate_stream(&request).await.unwrap();
        stream
            .map(|item| item.map_err(|e| e.to_string()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_replays_deltas() {
        let generator = ScriptedGenerator::new(["ab", "cd"]);
        assert_eq!(collect(&generator).await, vec![Ok("ab".into()), Ok("cd".into())]);
        assert_eq!(
            generator.generate(&GenerationRequest::new("x")).await.unwrap(),
            "abcd"
        );
        assert_eq!(generator.stream_calls(), 1);
        assert_eq!(generator.completion_calls(), 1);
    }

    #[tokio::test]
    async fn test_fail_after() {
        let generator = ScriptedGenerator::new(["a", "b", "c"]).fail_after(2, "boom");
        let items = collect(&generator).await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[2], Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_fail_on_open_and_completion() {
        let generator = ScriptedGenerator::new(Vec::<String>::new())
            .fail_on_open("refused")
            .fail_completion("down");
        let request = GenerationRequest::new("x").with_system("sys");
        assert!(generator.generate_stream(&request).await.is_err());
        assert!(generator.generate(&request).await.is_err());
        assert_eq!(generator.last_request(), Some(request));
    }

    #[test]
    fn test_chunked_keeps_multibyte_chars() {
        let generator = ScriptedGenerator::chunked("mèo chó", 2);
        assert_eq!(generator.deltas, vec!["mè", "o ", "ch", "ó"]);
    }
}
