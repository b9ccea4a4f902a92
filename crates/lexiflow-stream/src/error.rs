//! Session-level stream errors
//!
//! Only these escalate to the caller. Per-line problems are [`Rejection`]s
//! and never end a session.
//!
//! [`Rejection`]: crate::validator::Rejection

use crate::session::InvalidTransition;
use lexiflow_common::LexiflowError;
use std::fmt;

#[derive(Debug)]
pub enum StreamError {
    /// The connection failed or the body could not be read
    Transport(String),
    /// The text-generation collaborator failed (surfaced in-band by an `error` frame)
    Upstream(String),
    /// The server answered with a non-success status before streaming
    Status { status: u16, body: String },
    /// A newline-free fragment grew past the configured limit
    LineTooLong { len: usize, limit: usize },
    /// A session was driven through an illegal state change
    Session(InvalidTransition),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Transport(msg) => write!(f, "Transport error: {}", msg),
            StreamError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            StreamError::Status { status, body } => {
                write!(f, "Server responded with status {}: {}", status, body)
            }
            StreamError::LineTooLong { len, limit } => write!(
                f,
                "Line exceeded buffer limit without a newline (len={}, limit={})",
                len, limit
            ),
            StreamError::Session(err) => write!(f, "Session error: {}", err),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<InvalidTransition> for StreamError {
    fn from(err: InvalidTransition) -> Self {
        StreamError::Session(err)
    }
}

impl From<StreamError> for LexiflowError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Upstream(msg) => LexiflowError::Upstream(msg),
            other => LexiflowError::Transport(other.to_string()),
        }
    }
}
