//! Event-frame consumption for conversational streaming

use crate::consumer::{ConsumeOutcome, StreamConsumer};
use crate::error::StreamError;
use crate::record::EventFrame;
use crate::shape::FrameShape;
use futures::Stream;
use lexiflow_common::FramePayload;
use std::fmt;
use std::ops::ControlFlow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Payloads of one frame session and how its lifecycle ended
#[derive(Debug, Default)]
pub struct FrameOutcome {
    pub payloads: Vec<FramePayload>,
    pub started: bool,
    pub ended: bool,
    pub cancelled: bool,
}

impl FrameOutcome {
    /// The body ended without an `end` frame
    pub fn truncated(&self) -> bool {
        !self.cancelled && !self.ended
    }

    /// Concatenated text of every string payload stored under `key`
    pub fn text_for(&self, key: &str) -> String {
        self.payloads
            .iter()
            .filter(|p| p.key == key)
            .filter_map(FramePayload::text)
            .collect()
    }
}

/// Consumer for `start` / `data` / `end` streams
pub struct FrameConsumer {
    inner: StreamConsumer<FrameShape>,
}

impl Default for FrameConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameConsumer {
    pub fn new() -> Self {
        Self {
            inner: StreamConsumer::new(FrameShape),
        }
    }

    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.inner = self.inner.with_max_line_bytes(limit);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.inner = self.inner.with_cancellation(token);
        self
    }

    /// Read `body`, calling `on_payload` for each `data` frame inside the lifecycle
    ///
    /// An `error` frame ends the session with [`StreamError::Upstream`] after
    /// the payloads before it have been delivered.
    pub async fn consume<B, T, E, F>(self, body: B, mut on_payload: F) -> Result<FrameOutcome, StreamError>
    where
        B: Stream<Item = Result<T, E>>,
        T: AsRef<[u8]>,
        E: fmt::Display,
        F: FnMut(&FramePayload),
    {
        let mut outcome = FrameOutcome::default();

        let (consumed, _) = self
            .inner
            .run(body, |frame| {
                if outcome.ended {
                    debug!("Ignoring '{}' frame after end", frame.tag());
                    return ControlFlow::Continue(());
                }

                match frame {
                    EventFrame::Start => {
                        if outcome.started {
                            warn!("Ignoring repeated start frame");
                        }
                        outcome.started = true;
                    }
                    EventFrame::Data { .. } if !outcome.started => {
                        warn!("Ignoring data frame before start");
                    }
                    EventFrame::Data { key, content } => {
                        let payload = FramePayload { key, content };
                        on_payload(&payload);
                        outcome.payloads.push(payload);
                    }
                    EventFrame::End => outcome.ended = true,
                    EventFrame::Error { message } => {
                        return ControlFlow::Break(StreamError::Upstream(message));
                    }
                }
                ControlFlow::Continue(())
            })
            .await?;

        outcome.cancelled = consumed == ConsumeOutcome::Cancelled;
        if outcome.truncated() {
            warn!(
                "Frame stream ended without an end frame after {} payloads",
                outcome.payloads.len()
            );
        }
        Ok(outcome)
    }

    pub async fn collect<B, T, E>(self, body: B) -> Result<FrameOutcome, StreamError>
    where
        B: Stream<Item = Result<T, E>>,
        T: AsRef<[u8]>,
        E: fmt::Display,
    {
        self.consume(body, |_| {}).await
    }
}
