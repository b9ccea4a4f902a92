//! Client-side half: network bytes in, validated records out
//!
//! The consumer owns one [`Utf8Decoder`] and one [`ChunkBuffer`] per session.
//! Each record is handed to the caller the moment its line is complete, in
//! the order the producer wrote it. A [`CancellationToken`] is raced against
//! every read; once it fires nothing more is delivered.

use crate::buffer::ChunkBuffer;
use crate::decoder::Utf8Decoder;
use crate::error::StreamError;
use crate::session::{SessionRole, StreamSession};
use crate::shape::RecordShape;
use crate::validator::{Rejection, is_fence_marker, validate};
use futures::{Stream, StreamExt, stream};
use lexiflow_common::DEFAULT_MAX_LINE_BYTES;
use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;
use std::pin::{Pin, pin};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The body ended
    Completed,
    /// The cancellation token fired first
    Cancelled,
}

/// Records delivered by one consumer session
#[derive(Debug)]
pub struct Consumed<R> {
    pub records: Vec<R>,
    pub outcome: ConsumeOutcome,
    pub rejected: usize,
}

impl<R> Consumed<R> {
    pub fn is_cancelled(&self) -> bool {
        self.outcome == ConsumeOutcome::Cancelled
    }
}

/// Decoder, buffer and validation for one session
pub(crate) struct RecordReader<S: RecordShape> {
    decoder: Utf8Decoder,
    buffer: ChunkBuffer,
    shape: S,
    predicate: Option<Predicate<S::Record>>,
    max_line_bytes: usize,
    session: StreamSession,
}

impl<S: RecordShape> RecordReader<S> {
    /// Records completed by `bytes`, in order
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Result<Vec<S::Record>, StreamError> {
        let text = self.decoder.decode(bytes);
        self.buffer.append(&text);

        let mut records = Vec::new();
        for line in self.buffer.extract_complete_lines() {
            self.accept_line(&line, &mut records);
        }

        let pending = self.buffer.pending_len() + self.decoder.pending_len();
        if pending > self.max_line_bytes {
            self.buffer.discard_pending();
            return Err(StreamError::LineTooLong {
                len: pending,
                limit: self.max_line_bytes,
            });
        }
        Ok(records)
    }

    /// Records left in the buffer once the body has ended
    pub(crate) fn finish(&mut self) -> Vec<S::Record> {
        let tail = std::mem::take(&mut self.decoder).finish();
        self.buffer.append(&tail);

        let mut records = Vec::new();
        for line in self.buffer.extract_complete_lines() {
            self.accept_line(&line, &mut records);
        }
        let rest = std::mem::take(&mut self.buffer).flush_remainder();
        self.accept_line(&rest, &mut records);
        records
    }

    fn accept_line(&mut self, line: &str, out: &mut Vec<S::Record>) {
        if line.trim().is_empty() || is_fence_marker(line) {
            return;
        }

        for result in validate(line, &self.shape) {
            let result = result.and_then(|record| match &self.predicate {
                Some(accept) if !accept(&record) => Err(Rejection::Acceptance),
                _ => Ok(record),
            });
            match result {
                Ok(record) => {
                    self.session.record_delivered();
                    out.push(record);
                }
                Err(rejection @ Rejection::Malformed(_)) => {
                    self.session.record_rejected();
                    debug!("Skipping line: {}", rejection);
                }
                Err(rejection) => {
                    self.session.record_rejected();
                    warn!("Skipping {} record: {}", self.shape.kind(), rejection);
                }
            }
        }
    }
}

/// Reads one NDJSON body into records of shape `S`
pub struct StreamConsumer<S: RecordShape> {
    shape: S,
    predicate: Option<Predicate<S::Record>>,
    max_line_bytes: usize,
    cancel: Option<CancellationToken>,
}

impl<S: RecordShape> StreamConsumer<S> {
    pub fn new(shape: S) -> Self {
        Self {
            shape,
            predicate: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            cancel: None,
        }
    }

    /// Only records for which `accept` returns true are delivered
    pub fn with_predicate<F>(mut self, accept: F) -> Self
    where
        F: Fn(&S::Record) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(accept));
        self
    }

    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn into_reader(self) -> (RecordReader<S>, CancellationToken) {
        let reader = RecordReader {
            decoder: Utf8Decoder::new(),
            buffer: ChunkBuffer::new(),
            shape: self.shape,
            predicate: self.predicate,
            max_line_bytes: self.max_line_bytes,
            session: StreamSession::new(SessionRole::Consumer),
        };
        (reader, self.cancel.unwrap_or_default())
    }

    /// Read `body` to the end, calling `on_record` for each record as it completes
    pub async fn consume<B, T, E, F>(
        self,
        body: B,
        mut on_record: F,
    ) -> Result<Consumed<S::Record>, StreamError>
    where
        B: Stream<Item = Result<T, E>>,
        T: AsRef<[u8]>,
        E: fmt::Display,
        F: FnMut(&S::Record),
    {
        let mut records = Vec::new();
        let (outcome, rejected) = self
            .run(body, |record| {
                on_record(&record);
                records.push(record);
                ControlFlow::Continue(())
            })
            .await?;

        Ok(Consumed {
            records,
            outcome,
            rejected,
        })
    }

    /// Read `body` to the end and return every record
    pub async fn collect<B, T, E>(self, body: B) -> Result<Consumed<S::Record>, StreamError>
    where
        B: Stream<Item = Result<T, E>>,
        T: AsRef<[u8]>,
        E: fmt::Display,
    {
        self.consume(body, |_| {}).await
    }

    /// Pull-based variant: a stream of records
    ///
    /// Dropping the returned stream releases the body. After a transport
    /// error or cancellation the stream ends.
    pub fn record_stream<B, T, E>(self, body: B) -> impl Stream<Item = Result<S::Record, StreamError>>
    where
        B: Stream<Item = Result<T, E>>,
        T: AsRef<[u8]>,
        E: fmt::Display,
    {
        let (mut reader, token) = self.into_reader();
        if let Err(e) = reader.session.begin() {
            debug!("{}", e);
        }
        let state = PullState {
            reader,
            body: Box::pin(body),
            token,
            ready: VecDeque::new(),
            finished: false,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if state.token.is_cancelled() {
                    return None;
                }
                if let Some(record) = state.ready.pop_front() {
                    return Some((Ok(record), state));
                }
                if state.finished {
                    return None;
                }

                let next = tokio::select! {
                    biased;
                    _ = state.token.cancelled() => return None,
                    next = state.body.next() => next,
                };

                match next {
                    Some(Ok(chunk)) => match state.reader.feed(chunk.as_ref()) {
                        Ok(records) => state.ready.extend(records),
                        Err(e) => {
                            state.finished = true;
                            return Some((Err(e), state));
                        }
                    },
                    Some(Err(e)) => {
                        state.finished = true;
                        return Some((Err(StreamError::Transport(e.to_string())), state));
                    }
                    None => {
                        state.finished = true;
                        let rest = state.reader.finish();
                        state.ready.extend(rest);
                    }
                }
            }
        })
    }

    /// Drive one session, handing every record to `deliver`
    ///
    /// Returns the outcome and the number of rejected lines.
    pub(crate) async fn run<B, T, E, F>(
        self,
        body: B,
        deliver: F,
    ) -> Result<(ConsumeOutcome, usize), StreamError>
    where
        B: Stream<Item = Result<T, E>>,
        T: AsRef<[u8]>,
        E: fmt::Display,
        F: FnMut(S::Record) -> ControlFlow<StreamError>,
    {
        let (mut reader, token) = self.into_reader();
        let span = info_span!(
            "consumer",
            session = %reader.session.id(),
            role = %reader.session.role(),
            shape = reader.shape.kind()
        );

        async move {
            reader.session.begin()?;
            let result = drive(&mut reader, body, &token, deliver).await;
            if let Err(e) = reader.session.close() {
                debug!("{}", e);
            }

            match &result {
                Ok(outcome) => info!(
                    "Consumer session finished ({:?}): {} records, {} rejected",
                    outcome,
                    reader.session.records(),
                    reader.session.rejected()
                ),
                Err(e) => warn!("Consumer session failed: {}", e),
            }
            result.map(|outcome| (outcome, reader.session.rejected()))
        }
        .instrument(span)
        .await
    }
}

struct PullState<S: RecordShape, B> {
    reader: RecordReader<S>,
    body: Pin<Box<B>>,
    token: CancellationToken,
    ready: VecDeque<S::Record>,
    finished: bool,
}

async fn drive<S, B, T, E, F>(
    reader: &mut RecordReader<S>,
    body: B,
    token: &CancellationToken,
    mut deliver: F,
) -> Result<ConsumeOutcome, StreamError>
where
    S: RecordShape,
    B: Stream<Item = Result<T, E>>,
    T: AsRef<[u8]>,
    E: fmt::Display,
    F: FnMut(S::Record) -> ControlFlow<StreamError>,
{
    let mut body = pin!(body);

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(ConsumeOutcome::Cancelled),
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for record in reader.feed(chunk.as_ref())? {
                    if token.is_cancelled() {
                        return Ok(ConsumeOutcome::Cancelled);
                    }
                    if let ControlFlow::Break(e) = deliver(record) {
                        return Err(e);
                    }
                }
            }
            Some(Err(e)) => return Err(StreamError::Transport(e.to_string())),
            None => break,
        }
    }

    reader.session.drain()?;
    for record in reader.finish() {
        if token.is_cancelled() {
            return Ok(ConsumeOutcome::Cancelled);
        }
        if let ControlFlow::Break(e) = deliver(record) {
            return Err(e);
        }
    }
    Ok(ConsumeOutcome::Completed)
}
