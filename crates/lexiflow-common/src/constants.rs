//! Common constants used across Lexiflow

/// Default bind host for the API server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port for the API server
pub const DEFAULT_PORT: u16 = 3000;

/// Default model handed to the text-generation client
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration file read by both binaries
pub const DEFAULT_CONFIG_PATH: &str = "lexiflow.toml";

/// Default server URL the CLI talks to
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Largest newline-free fragment a line buffer may hold
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024; // 64KB

/// Capacity of the producer's outbound channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Field used to wrap a fallback result that is not itself a record
pub const DEFAULT_FALLBACK_KEY: &str = "content";

/// Default and maximum number of records a request may ask for
pub const DEFAULT_RECORD_COUNT: usize = 10;
pub const DEFAULT_MAX_RECORDS: usize = 50;

/// Content type of newline-delimited JSON responses
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Route paths shared by the server and the CLI
pub mod routes {
    pub const VOCABULARY: &str = "/api/stream/vocabulary";
    pub const PRODUCTS: &str = "/api/stream/products";
    pub const EVALUATION: &str = "/api/stream/evaluation";
    pub const ANSWER: &str = "/api/stream/answer";
    pub const HEALTH: &str = "/health";
}

/// Environment variable names read by the config loader
pub mod env {
    pub const HOST: &str = "LEXIFLOW_HOST";
    pub const PORT: &str = "LEXIFLOW_PORT";
    pub const MODEL: &str = "LEXIFLOW_MODEL";
    pub const LOG: &str = "LEXIFLOW_LOG";
}

/// Connect timeout for the CLI's HTTP client, in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;
