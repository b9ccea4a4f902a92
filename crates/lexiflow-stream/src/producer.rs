//! Server-side half: model deltas in, newline-delimited records out
//!
//! A [`StreamProducer`] reads the generator's delta stream through one
//! [`ChunkBuffer`], validates every complete line and writes each record to
//! the outbound channel as soon as it exists. When streaming yields nothing
//! usable it makes a single non-streaming call instead.

use crate::buffer::ChunkBuffer;
use crate::record::EventFrame;
use crate::session::{SessionRole, StreamSession};
use crate::shape::{DomainShape, FrameShape, RecordShape, ShapeContract};
use crate::validator::{Rejection, extract_objects, is_fence_marker, validate};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use lexiflow_common::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_FALLBACK_KEY, DEFAULT_MAX_LINE_BYTES, StreamConfig};
use lexiflow_llm::{GenerationRequest, TextGenerator};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// What the producer writes
#[derive(Debug, Clone)]
pub enum ProducerMode {
    /// One JSON object per line, each satisfying `contract`
    Domain { contract: ShapeContract },
    /// `start`, `data`*, then `end` (or `error`)
    Frames,
}

impl ProducerMode {
    fn label(&self) -> &'static str {
        match self {
            ProducerMode::Domain { .. } => "domain",
            ProducerMode::Frames => "frames",
        }
    }
}

/// How a producer session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerOutcome {
    /// Every record the model produced was written (directly or via fallback)
    Completed,
    /// The delta stream failed after records had already been written
    Truncated { reason: String },
    /// Both the streaming call and the fallback failed
    UpstreamFailed { reason: String },
    /// The receiving side went away; nothing more could be written
    ClientGone,
}

/// Summary of one producer session
#[derive(Debug, Clone)]
pub struct ProducerReport {
    pub session_id: String,
    pub records_written: usize,
    pub lines_rejected: usize,
    pub fallback_used: bool,
    pub outcome: ProducerOutcome,
}

/// Receiving half of a spawned producer
pub struct ProducerStream {
    body: ReceiverStream<Bytes>,
    handle: JoinHandle<ProducerReport>,
}

impl ProducerStream {
    /// Body chunks, ready for `axum::body::Body::from_stream`
    pub fn into_body(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        self.body.map(Ok::<Bytes, Infallible>)
    }

    pub fn into_parts(self) -> (ReceiverStream<Bytes>, JoinHandle<ProducerReport>) {
        (self.body, self.handle)
    }
}

/// The receiver was dropped
struct ClientGone;

#[derive(Clone)]
pub struct StreamProducer {
    generator: Arc<dyn TextGenerator>,
    mode: ProducerMode,
    max_line_bytes: usize,
    fallback_key: String,
    channel_capacity: usize,
    record_limit: Option<usize>,
}

impl StreamProducer {
    pub fn new(generator: Arc<dyn TextGenerator>, mode: ProducerMode) -> Self {
        Self {
            generator,
            mode,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            fallback_key: DEFAULT_FALLBACK_KEY.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            record_limit: None,
        }
    }

    pub fn domain(generator: Arc<dyn TextGenerator>, contract: ShapeContract) -> Self {
        Self::new(generator, ProducerMode::Domain { contract })
    }

    pub fn frames(generator: Arc<dyn TextGenerator>) -> Self {
        Self::new(generator, ProducerMode::Frames)
    }

    /// Apply the `[stream]` section of the configuration
    pub fn with_config(mut self, config: &StreamConfig) -> Self {
        self.max_line_bytes = config.max_line_bytes;
        self.fallback_key = config.fallback_key.clone();
        self.channel_capacity = config.channel_capacity;
        self
    }

    pub fn with_fallback_key(mut self, key: impl Into<String>) -> Self {
        self.fallback_key = key.into();
        self
    }

    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    /// Stop reading the model once `limit` records have been written
    pub fn with_record_limit(mut self, limit: usize) -> Self {
        self.record_limit = Some(limit);
        self
    }

    /// Run the session on a spawned task and return the body stream
    pub fn spawn(self, request: GenerationRequest) -> ProducerStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity.max(1));
        let handle = tokio::spawn(async move { self.run(&request, &tx).await });
        ProducerStream {
            body: ReceiverStream::new(rx),
            handle,
        }
    }

    /// Run one session, writing every line to `tx`
    pub async fn run(&self, request: &GenerationRequest, tx: &mpsc::Sender<Bytes>) -> ProducerReport {
        let session = StreamSession::new(SessionRole::Producer);
        let span = info_span!(
            "producer",
            session = %session.id(),
            role = %session.role(),
            mode = self.mode.label(),
            generator = self.generator.name()
        );
        SessionRun::new(self, session, tx).execute(request).instrument(span).await
    }
}

/// One session's counters, shape and outbound channel
struct SessionRun<'a> {
    producer: &'a StreamProducer,
    session: StreamSession,
    tx: &'a mpsc::Sender<Bytes>,
    shape: Option<DomainShape<Value>>,
}

impl<'a> SessionRun<'a> {
    fn new(producer: &'a StreamProducer, session: StreamSession, tx: &'a mpsc::Sender<Bytes>) -> Self {
        let shape = match &producer.mode {
            ProducerMode::Domain { contract } => Some(DomainShape::new("domain", contract.clone())),
            ProducerMode::Frames => None,
        };
        Self {
            producer,
            session,
            tx,
            shape,
        }
    }

    fn is_frames(&self) -> bool {
        matches!(self.producer.mode, ProducerMode::Frames)
    }

    fn limit_reached(&self) -> bool {
        self.producer
            .record_limit
            .is_some_and(|limit| self.session.records() >= limit)
    }

    async fn execute(mut self, request: &GenerationRequest) -> ProducerReport {
        info!("Producer session started");
        let mut fallback_used = false;

        let outcome = match self.stream_and_finish(request, &mut fallback_used).await {
            Ok(outcome) => outcome,
            Err(ClientGone) => {
                info!("Client disconnected; stopping producer");
                ProducerOutcome::ClientGone
            }
        };

        if let Err(e) = self.session.close() {
            debug!("{}", e);
        }

        let report = ProducerReport {
            session_id: self.session.id().to_string(),
            records_written: self.session.records(),
            lines_rejected: self.session.rejected(),
            fallback_used,
            outcome,
        };
        info!(
            "Producer session finished: {} records, {} rejected, fallback={}, outcome={:?}",
            report.records_written, report.lines_rejected, report.fallback_used, report.outcome
        );
        report
    }

    async fn stream_and_finish(
        &mut self,
        request: &GenerationRequest,
        fallback_used: &mut bool,
    ) -> Result<ProducerOutcome, ClientGone> {
        if let Err(e) = self.session.begin() {
            debug!("{}", e);
        }
        if self.is_frames() {
            self.send(EventFrame::Start.to_line()).await?;
        }

        let failure = self.stream_deltas(request).await?;

        if self.session.records() == 0 {
            match &failure {
                Some(reason) => warn!("Streaming produced no records ({}); falling back", reason),
                None => warn!("Streaming ended without a valid record; falling back"),
            }
            *fallback_used = true;
            return self.fallback(request).await;
        }

        match failure {
            None => {
                if self.is_frames() {
                    self.send(EventFrame::End.to_line()).await?;
                }
                Ok(ProducerOutcome::Completed)
            }
            Some(reason) => {
                warn!(
                    "Stream failed after {} records; truncating: {}",
                    self.session.records(),
                    reason
                );
                if self.is_frames() {
                    let frame = EventFrame::Error {
                        message: reason.clone(),
                    };
                    self.send(frame.to_line()).await?;
                }
                Ok(ProducerOutcome::Truncated { reason })
            }
        }
    }

    /// Drive the delta stream; returns the upstream failure, if any
    async fn stream_deltas(&mut self, request: &GenerationRequest) -> Result<Option<String>, ClientGone> {
        let generator = Arc::clone(&self.producer.generator);
        let mut deltas = match generator.generate_stream(request).await {
            Ok(deltas) => deltas,
            Err(e) => return Ok(Some(e.to_string())),
        };

        let mut buffer = ChunkBuffer::new();
        while let Some(delta) = deltas.next().await {
            let text = match delta {
                Ok(text) => text,
                Err(e) => return Ok(Some(e.to_string())),
            };

            buffer.append(&text);
            for line in buffer.extract_complete_lines() {
                self.handle_line(&line).await?;
                if self.limit_reached() {
                    debug!("Record limit reached; ending stream early");
                    return Ok(None);
                }
            }

            if buffer.pending_len() > self.producer.max_line_bytes {
                let dropped = buffer.discard_pending();
                self.session.record_rejected();
                warn!(
                    "Dropped {} bytes without a newline (limit {})",
                    dropped, self.producer.max_line_bytes
                );
            }
        }

        if let Err(e) = self.session.drain() {
            debug!("{}", e);
        }
        let rest = buffer.flush_remainder();
        self.handle_line(&rest).await?;
        Ok(None)
    }

    async fn handle_line(&mut self, line: &str) -> Result<(), ClientGone> {
        if line.trim().is_empty() || is_fence_marker(line) {
            return Ok(());
        }
        if line.len() > self.producer.max_line_bytes {
            self.session.record_rejected();
            warn!("Dropped oversized line ({} bytes)", line.len());
            return Ok(());
        }

        for wire_line in self.records_for_line(line) {
            if self.limit_reached() {
                break;
            }
            self.send(wire_line).await?;
            self.session.record_delivered();
        }
        Ok(())
    }

    /// Wire lines for every valid record in a candidate line
    fn records_for_line(&mut self, line: &str) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.shape {
            Some(shape) => {
                for result in validate(line, shape) {
                    match result {
                        Ok(record) => lines.push(record_line(&record)),
                        Err(rejection) => {
                            self.session.record_rejected();
                            debug!("Skipping line: {}", rejection);
                        }
                    }
                }
            }
            None => {
                for result in extract_objects(line) {
                    match result.and_then(|object| self.frame_for_object(object)) {
                        Ok(Some(frame)) => lines.push(frame.to_line()),
                        Ok(None) => {}
                        Err(rejection) => {
                            self.session.record_rejected();
                            debug!("Skipping line: {}", rejection);
                        }
                    }
                }
            }
        }
        lines
    }

    /// Model output in frame mode: ready-made `data` frames or bare objects
    fn frame_for_object(
        &self,
        object: Map<String, Value>,
    ) -> Result<Option<EventFrame>, Rejection> {
        if !object.contains_key("e") {
            if object.is_empty() {
                return Err(Rejection::Shape("empty object".to_string()));
            }
            return Ok(Some(EventFrame::data(
                self.producer.fallback_key.clone(),
                Value::Object(object),
            )));
        }

        match FrameShape.accept(object)? {
            frame @ EventFrame::Data { .. } => Ok(Some(frame)),
            other => {
                debug!("Ignoring model-emitted '{}' frame", other.tag());
                Ok(None)
            }
        }
    }

    /// One non-streaming call; its text becomes records or a single wrapper
    async fn fallback(&mut self, request: &GenerationRequest) -> Result<ProducerOutcome, ClientGone> {
        let text = match self.producer.generator.generate(request).await {
            Ok(text) => text,
            Err(e) => {
                error!("Fallback generation failed: {}", e);
                let reason = e.to_string();
                if self.is_frames() {
                    let frame = EventFrame::Error {
                        message: reason.clone(),
                    };
                    self.send(frame.to_line()).await?;
                }
                return Ok(ProducerOutcome::UpstreamFailed { reason });
            }
        };

        let lines = match &self.shape {
            Some(shape) => self.fallback_records(shape, &text),
            None => vec![EventFrame::data(self.producer.fallback_key.clone(), text).to_line()],
        };
        for line in lines {
            if self.limit_reached() {
                break;
            }
            self.send(line).await?;
            self.session.record_delivered();
        }

        if self.is_frames() {
            self.send(EventFrame::End.to_line()).await?;
        }
        Ok(ProducerOutcome::Completed)
    }

    /// Every valid record in `text`, in order; a wrapper when none validate
    ///
    /// Lines are tried first, then the text as a whole, so pretty-printed
    /// single objects still count.
    fn fallback_records(&self, shape: &DomainShape<Value>, text: &str) -> Vec<String> {
        let mut buffer = ChunkBuffer::new();
        buffer.append(text);
        let mut candidates = buffer.extract_complete_lines();
        candidates.push(buffer.flush_remainder());

        let mut records: Vec<String> = candidates
            .iter()
            .filter(|line| !line.trim().is_empty() && !is_fence_marker(line))
            .flat_map(|line| validate(line, shape))
            .filter_map(Result::ok)
            .map(|record| record_line(&record))
            .collect();
        if records.is_empty() {
            records = validate(text, shape)
                .into_iter()
                .filter_map(Result::ok)
                .map(|record| record_line(&record))
                .collect();
        }
        if !records.is_empty() {
            return records;
        }

        let mut wrapper = Map::new();
        wrapper.insert(
            self.producer.fallback_key.clone(),
            Value::String(text.to_string()),
        );
        vec![record_line(&Value::Object(wrapper))]
    }

    async fn send(&self, line: String) -> Result<(), ClientGone> {
        self.tx.send(Bytes::from(line)).await.map_err(|_| ClientGone)
    }
}

fn record_line(record: &Value) -> String {
    let mut line = record.to_string();
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexiflow_llm::ScriptedGenerator;
    use serde_json::json;
    use std::time::Duration;

    fn vocabulary_contract() -> ShapeContract {
        ShapeContract::new().require_string("word").require_string("meaning")
    }

    async fn run_to_lines(producer: StreamProducer) -> (Vec<Value>, ProducerReport) {
        let stream = producer.spawn(GenerationRequest::new("prompt"));
        let (body, handle) = stream.into_parts();
        let chunks: Vec<Bytes> = body.collect().await;
        let report = handle.await.unwrap();

        let text: String = chunks
            .iter()
            .map(|c| String::from_utf8(c.to_vec()).unwrap())
            .collect();
        assert!(text.is_empty() || text.ends_with('\n'));
        let lines = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (lines, report)
    }

    #[tokio::test]
    async fn test_records_written_in_order() {
        let generator = Arc::new(ScriptedGenerator::new([
            "{\"word\":\"ca",
            "t\",\"meaning\":\"mèo\"}\n{\"word\":\"dog",
            "\",\"meaning\":\"chó\"}\n",
        ]));
        let producer = StreamProducer::domain(generator.clone(), vocabulary_contract());
        let (lines, report) = run_to_lines(producer).await;

        assert_eq!(
            lines,
            vec![
                json!({"word": "cat", "meaning": "mèo"}),
                json!({"word": "dog", "meaning": "chó"})
            ]
        );
        assert_eq!(report.records_written, 2);
        assert_eq!(report.outcome, ProducerOutcome::Completed);
        assert!(!report.fallback_used);
        assert_eq!(generator.completion_calls(), 0);
    }

    #[tokio::test]
    async fn test_noise_is_skipped() {
        let generator = Arc::new(ScriptedGenerator::new([
            "```json\n",
            "{\"word\":\"cat\",\"meaning\":\"mèo\"}\n",
            "Here is another:\n",
            "{\"word\":\"\",\"meaning\":\"x\"}\n",
            "{\"word\":\"dog\",\"meaning\":\"chó\"}",
            "\n```",
        ]));
        let producer = StreamProducer::domain(generator, vocabulary_contract());
        let (lines, report) = run_to_lines(producer).await;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["word"], "dog");
        assert_eq!(report.lines_rejected, 2);
    }

    #[tokio::test]
    async fn test_final_line_without_newline_is_flushed() {
        let generator = Arc::new(ScriptedGenerator::new([
            "{\"word\":\"cat\",\"meaning\":\"mèo\"}",
        ]));
        let producer = StreamProducer::domain(generator, vocabulary_contract());
        let (lines, _) = run_to_lines(producer).await;
        assert_eq!(lines, vec![json!({"word": "cat", "meaning": "mèo"})]);
    }

    #[tokio::test]
    async fn test_fallback_wraps_plain_text() {
        let generator = Arc::new(
            ScriptedGenerator::new(Vec::<String>::new())
                .fail_on_open("stream refused")
                .with_completion("hello"),
        );
        let producer = StreamProducer::domain(generator.clone(), vocabulary_contract());
        let (lines, report) = run_to_lines(producer).await;

        assert_eq!(lines, vec![json!({"content": "hello"})]);
        assert!(report.fallback_used);
        assert_eq!(report.outcome, ProducerOutcome::Completed);
        assert_eq!(generator.completion_calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_uses_parsed_record() {
        let generator = Arc::new(
            ScriptedGenerator::new(Vec::<String>::new())
                .fail_on_open("stream refused")
                .with_completion("```json\n{\"word\":\"cat\",\"meaning\":\"mèo\"}\n```"),
        );
        let producer = StreamProducer::domain(generator, vocabulary_contract());
        let (lines, _) = run_to_lines(producer).await;
        assert_eq!(lines, vec![json!({"word": "cat", "meaning": "mèo"})]);
    }

    #[tokio::test]
    async fn test_fallback_writes_every_valid_record() {
        let generator = Arc::new(
            ScriptedGenerator::new(Vec::<String>::new())
                .fail_on_open("stream refused")
                .with_completion(
                    "{\"word\":\"cat\",\"meaning\":\"mèo\"}\n{\"word\":\"dog\",\"meaning\":\"chó\"}\n",
                ),
        );
        let producer = StreamProducer::domain(generator, vocabulary_contract());
        let (lines, report) = run_to_lines(producer).await;

        assert_eq!(
            lines,
            vec![
                json!({"word": "cat", "meaning": "mèo"}),
                json!({"word": "dog", "meaning": "chó"})
            ]
        );
        assert_eq!(report.records_written, 2);
        assert!(report.fallback_used);
    }

    #[tokio::test]
    async fn test_fallback_respects_record_limit() {
        let generator = Arc::new(
            ScriptedGenerator::new(Vec::<String>::new())
                .fail_on_open("stream refused")
                .with_completion(
                    "{\"word\":\"cat\",\"meaning\":\"mèo\"}\n\
                     {\"word\":\"dog\",\"meaning\":\"chó\"}\n\
                     {\"word\":\"fish\",\"meaning\":\"cá\"}\n",
                ),
        );
        let producer = StreamProducer::domain(generator, vocabulary_contract()).with_record_limit(2);
        let (lines, report) = run_to_lines(producer).await;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["word"], "dog");
        assert_eq!(report.records_written, 2);
    }

    #[tokio::test]
    async fn test_fallback_after_empty_stream() {
        let generator = Arc::new(
            ScriptedGenerator::new(["I cannot produce JSON today.\n"]).with_completion("plain"),
        );
        let producer = StreamProducer::domain(generator, vocabulary_contract()).with_fallback_key("text");
        let (lines, report) = run_to_lines(producer).await;

        assert_eq!(lines, vec![json!({"text": "plain"})]);
        assert!(report.fallback_used);
    }

    #[tokio::test]
    async fn test_midstream_failure_truncates_without_retry() {
        let generator = Arc::new(
            ScriptedGenerator::new([
                "{\"word\":\"cat\",\"meaning\":\"mèo\"}\n",
                "{\"word\":\"dog\",",
            ])
            .fail_after(2, "connection reset"),
        );
        let producer = StreamProducer::domain(generator.clone(), vocabulary_contract());
        let (lines, report) = run_to_lines(producer).await;

        assert_eq!(lines.len(), 1);
        assert_eq!(
            report.outcome,
            ProducerOutcome::Truncated {
                reason: "connection reset".to_string()
            }
        );
        assert_eq!(generator.completion_calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_failure_ends_response() {
        let generator = Arc::new(
            ScriptedGenerator::new(Vec::<String>::new())
                .fail_on_open("stream refused")
                .fail_completion("quota exceeded"),
        );
        let producer = StreamProducer::domain(generator, vocabulary_contract());
        let (lines, report) = run_to_lines(producer).await;

        assert!(lines.is_empty());
        assert_eq!(
            report.outcome,
            ProducerOutcome::UpstreamFailed {
                reason: "quota exceeded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_frames_lifecycle() {
        let generator = Arc::new(ScriptedGenerator::new([
            "{\"e\":\"start\"}\n{\"e\":\"data\",\"k\":\"answer\",\"c\":\"Xin \"}\n",
            "{\"e\":\"data\",\"k\":\"answer\",\"c\":\"chào\"}{\"e\":\"end\"}\n",
        ]));
        let (lines, report) = run_to_lines(StreamProducer::frames(generator)).await;

        assert_eq!(
            lines,
            vec![
                json!({"e": "start"}),
                json!({"e": "data", "k": "answer", "c": "Xin "}),
                json!({"e": "data", "k": "answer", "c": "chào"}),
                json!({"e": "end"}),
            ]
        );
        assert_eq!(report.records_written, 2);
    }

    #[tokio::test]
    async fn test_frames_wrap_bare_objects() {
        let generator = Arc::new(ScriptedGenerator::new(["{\"band\":7}\n"]));
        let (lines, _) = run_to_lines(StreamProducer::frames(generator)).await;
        assert_eq!(
            lines[1],
            json!({"e": "data", "k": "content", "c": {"band": 7}})
        );
    }

    #[tokio::test]
    async fn test_frames_fallback_triple() {
        let generator = Arc::new(
            ScriptedGenerator::new(Vec::<String>::new())
                .fail_on_open("stream refused")
                .with_completion("hello"),
        );
        let (lines, _) = run_to_lines(StreamProducer::frames(generator)).await;
        assert_eq!(
            lines,
            vec![
                json!({"e": "start"}),
                json!({"e": "data", "k": "content", "c": "hello"}),
                json!({"e": "end"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_frames_midstream_failure_writes_error_frame() {
        let generator = Arc::new(
            ScriptedGenerator::new([
                "{\"e\":\"data\",\"k\":\"answer\",\"c\":\"partial\"}\n",
                "{\"e\":\"data\"",
            ])
            .fail_after(1, "upstream closed"),
        );
        let (lines, report) = run_to_lines(StreamProducer::frames(generator)).await;

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], json!({"e": "error", "message": "upstream closed"}));
        assert!(matches!(report.outcome, ProducerOutcome::Truncated { .. }));
    }

    #[tokio::test]
    async fn test_oversized_fragment_is_dropped() {
        let long = format!("{{\"word\":\"{}\"", "x".repeat(100));
        let generator = Arc::new(ScriptedGenerator::new([
            long.as_str(),
            ",\"meaning\":\"m\"}\n",
            "{\"word\":\"cat\",\"meaning\":\"mèo\"}\n",
        ]));
        let producer = StreamProducer::domain(generator, vocabulary_contract()).with_max_line_bytes(64);
        let (lines, report) = run_to_lines(producer).await;

        assert_eq!(lines, vec![json!({"word": "cat", "meaning": "mèo"})]);
        assert!(report.lines_rejected >= 1);
    }

    #[tokio::test]
    async fn test_record_limit() {
        let deltas: Vec<String> = (0..5)
            .map(|i| format!("{{\"word\":\"w{}\",\"meaning\":\"m\"}}\n", i))
            .collect();
        let generator = Arc::new(ScriptedGenerator::new(deltas));
        let producer = StreamProducer::domain(generator, vocabulary_contract()).with_record_limit(3);
        let (lines, report) = run_to_lines(producer).await;
        assert_eq!(lines.len(), 3);
        assert_eq!(report.outcome, ProducerOutcome::Completed);
    }

    #[tokio::test]
    async fn test_client_gone_stops_producer() {
        let deltas: Vec<String> = (0..20)
            .map(|i| format!("{{\"word\":\"w{}\",\"meaning\":\"m\"}}\n", i))
            .collect();
        let generator = Arc::new(ScriptedGenerator::new(deltas));
        let producer = StreamProducer::domain(generator.clone(), vocabulary_contract());

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let report = producer.run(&GenerationRequest::new("prompt"), &tx).await;

        assert_eq!(report.outcome, ProducerOutcome::ClientGone);
        assert_eq!(report.records_written, 0);
        assert_eq!(generator.completion_calls(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_mid_stream() {
        let deltas: Vec<String> = (0..20)
            .map(|i| format!("{{\"word\":\"w{}\",\"meaning\":\"m\"}}\n", i))
            .collect();
        let generator = Arc::new(ScriptedGenerator::new(deltas).with_delay(Duration::from_millis(5)));
        let producer = StreamProducer::domain(generator, vocabulary_contract());

        let (mut body, handle) = producer.spawn(GenerationRequest::new("prompt")).into_parts();
        let first = body.next().await.unwrap();
        assert!(String::from_utf8(first.to_vec()).unwrap().contains("\"w0\""));
        drop(body);

        let report = handle.await.unwrap();
        assert_eq!(report.outcome, ProducerOutcome::ClientGone);
        assert!(report.records_written >= 1 && report.records_written < 20);
    }
}
