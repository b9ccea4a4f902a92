//! Configuration types and utilities for Lexiflow

use crate::constants::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_FALLBACK_KEY, DEFAULT_HOST, DEFAULT_MAX_LINE_BYTES,
    DEFAULT_MAX_RECORDS, DEFAULT_MODEL, DEFAULT_PORT, env as env_keys,
};
use crate::error::{LexiflowError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration
///
/// The server reads every section; the CLI only reads `stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiflowConfig {
    pub log_level: String,
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub stream: StreamConfig,
}

impl Default for LexiflowConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

/// Where the HTTP server binds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Provider configuration for the text-generation service
///
/// The provider itself is inferred from the model name; credentials come
/// from the provider's usual environment variable (e.g. `GEMINI_API_KEY`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Model identifier passed to the provider
    pub model: String,
    /// System prompt prepended to every generation request
    pub system_prompt: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
        }
    }
}

/// Tuning for the record streaming pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Largest newline-free fragment a buffer may hold
    pub max_line_bytes: usize,
    /// Capacity of the producer's outbound channel
    pub channel_capacity: usize,
    /// Field used when wrapping a non-record result
    pub fallback_key: String,
    /// Upper bound on records a single request may ask for
    pub max_records: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            fallback_key: DEFAULT_FALLBACK_KEY.to_string(),
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

impl LexiflowConfig {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            let config_str = fs::read_to_string(config_path)?;
            let config: LexiflowConfig = toml::from_str(&config_str).map_err(|e| {
                LexiflowError::Config(format!(
                    "Failed to parse config file {:?}: {}",
                    config_path, e
                ))
            })?;
            debug!("Loaded configuration from {:?}", config_path);
            config.validate()?;
            Ok(config)
        } else {
            let config = LexiflowConfig::default();
            config.save(config_path)?;
            info!("Wrote default configuration to {:?}", config_path);
            Ok(config)
        }
    }

    /// Load configuration if the file exists, otherwise use defaults without writing
    pub fn load_or_default<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        if config_path.as_ref().exists() {
            Self::load(config_path)
        } else {
            debug!("No configuration at {:?}; using defaults", config_path.as_ref());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let config_str = toml::to_string_pretty(self)?;
        fs::write(config_path, config_str)?;
        Ok(())
    }

    /// Apply `LEXIFLOW_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(env_keys::HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(env_keys::PORT) {
            self.server.port = port.parse().map_err(|_| {
                LexiflowError::Config(format!("{} is not a valid port: {}", env_keys::PORT, port))
            })?;
        }
        if let Some(model) = lookup(env_keys::MODEL) {
            self.provider.model = model;
        }
        if let Some(level) = lookup(env_keys::LOG) {
            self.log_level = level;
        }
        self.validate()
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.stream.max_line_bytes == 0 {
            return Err(LexiflowError::Config(
                "stream.max_line_bytes must be greater than zero".to_string(),
            ));
        }
        if self.stream.channel_capacity == 0 {
            return Err(LexiflowError::Config(
                "stream.channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.stream.fallback_key.trim().is_empty() {
            return Err(LexiflowError::Config(
                "stream.fallback_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
