//! Per-session lifecycle bookkeeping
//!
//! `Idle -> Streaming -> Draining -> Closed`, with `Streaming -> Closed` when
//! the session fails. A closed session is never reopened.

use lexiflow_common::generate_short_id;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing read or written yet
    Idle,
    /// Reading deltas or network chunks
    Streaming,
    /// Input exhausted; flushing the buffer remainder
    Draining,
    /// Finished, successfully or not
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Streaming => "streaming",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Producer,
    Consumer,
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionRole::Producer => f.write_str("producer"),
            SessionRole::Consumer => f.write_str("consumer"),
        }
    }
}

/// A state change that the lifecycle does not allow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: SessionState,
    pub to: SessionState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move session from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Identity, state and counters of one producer or consumer run
#[derive(Debug)]
pub struct StreamSession {
    id: String,
    role: SessionRole,
    state: SessionState,
    records: usize,
    rejected: usize,
}

impl StreamSession {
    pub fn new(role: SessionRole) -> Self {
        Self {
            id: generate_short_id(),
            role,
            state: SessionState::Idle,
            records: 0,
            rejected: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn record_delivered(&mut self) {
        self.records += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    /// `Idle -> Streaming`
    pub fn begin(&mut self) -> Result<(), InvalidTransition> {
        self.transition(SessionState::Idle, SessionState::Streaming)
    }

    /// `Streaming -> Draining`
    pub fn drain(&mut self) -> Result<(), InvalidTransition> {
        self.transition(SessionState::Streaming, SessionState::Draining)
    }

    /// `Draining -> Closed` or, on failure, `Streaming -> Closed`
    pub fn close(&mut self) -> Result<(), InvalidTransition> {
        match self.state {
            SessionState::Streaming | SessionState::Draining => {
                self.state = SessionState::Closed;
                Ok(())
            }
            from => Err(InvalidTransition {
                from,
                to: SessionState::Closed,
            }),
        }
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> Result<(), InvalidTransition> {
        if self.state != from {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
