//! Incremental structured-record streaming for Lexiflow
//!
//! Model output arrives as an unbounded stream of text deltas. The
//! [`producer`] turns it into newline-delimited JSON records on an HTTP
//! response; the [`consumer`] reads that response back, tolerating arbitrary
//! chunk boundaries, and hands validated records to the caller as soon as
//! each line is complete. Both halves share the [`buffer`], the
//! [`validator`] and the [`shape`] contracts. [`frames`] adds the
//! `start`/`data`/`end` event-frame variant used for question answering,
//! and [`catalog`] holds the contracts of the record kinds Lexiflow serves.

pub mod buffer;
pub mod catalog;
pub mod consumer;
pub mod decoder;
pub mod error;
pub mod frames;
pub mod http;
pub mod producer;
pub mod record;
pub mod session;
pub mod shape;
pub mod validator;

pub use buffer::ChunkBuffer;
pub use consumer::{ConsumeOutcome, Consumed, StreamConsumer};
pub use decoder::Utf8Decoder;
pub use error::StreamError;
pub use frames::{FrameConsumer, FrameOutcome};
pub use http::{fetch_frames, fetch_records, open_stream};
pub use producer::{ProducerMode, ProducerOutcome, ProducerReport, ProducerStream, StreamProducer};
pub use record::EventFrame;
pub use session::{SessionRole, SessionState, StreamSession};
pub use shape::{DomainShape, FieldKind, FrameShape, RecordShape, ShapeContract};
pub use validator::{Rejection, extract_objects, validate};
