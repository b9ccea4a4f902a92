//! Lexiflow Common - Shared utilities and types
//!
//! This crate provides the error type, configuration structs, record
//! definitions and small helpers used across all Lexiflow components.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::{LexiflowConfig, ProviderConfig, ServerConfig, StreamConfig};
pub use constants::*;
pub use error::{LexiflowError, Result};
pub use types::{Evaluation, FramePayload, ProductListing, VocabularyItem};
pub use utils::*;
