//! Lexiflow Common Error Types
//!
//! Centralized error handling for all Lexiflow components

use std::fmt;

/// Main error type for Lexiflow operations
#[derive(Debug)]
pub enum LexiflowError {
    /// Generic error with message
    Generic(String),
    /// IO-related errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serde(serde_json::Error),
    /// Configuration errors
    Config(String),
    /// The text-generation collaborator failed
    Upstream(String),
    /// The HTTP transport failed or the peer went away
    Transport(String),
    /// A request was rejected before any streaming began
    InvalidRequest(String),
}

impl fmt::Display for LexiflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexiflowError::Generic(msg) => write!(f, "Lexiflow error: {}", msg),
            LexiflowError::Io(err) => write!(f, "IO error: {}", err),
            LexiflowError::Serde(err) => write!(f, "Serialization error: {}", err),
            LexiflowError::Config(msg) => write!(f, "Configuration error: {}", msg),
            LexiflowError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            LexiflowError::Transport(msg) => write!(f, "Transport error: {}", msg),
            LexiflowError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for LexiflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LexiflowError::Io(err) => Some(err),
            LexiflowError::Serde(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience result type for Lexiflow operations
pub type Result<T> = std::result::Result<T, LexiflowError>;

// Implement From traits for common error types
impl From<std::io::Error> for LexiflowError {
    fn from(err: std::io::Error) -> Self {
        LexiflowError::Io(err)
    }
}

impl From<serde_json::Error> for LexiflowError {
    fn from(err: serde_json::Error) -> Self {
        LexiflowError::Serde(err)
    }
}

impl From<toml::de::Error> for LexiflowError {
    fn from(err: toml::de::Error) -> Self {
        LexiflowError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LexiflowError {
    fn from(err: toml::ser::Error) -> Self {
        LexiflowError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for LexiflowError {
    fn from(err: anyhow::Error) -> Self {
        LexiflowError::Generic(err.to_string())
    }
}
