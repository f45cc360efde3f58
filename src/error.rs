//! Error types for Cir
//!
//! This module defines the error taxonomy used throughout the client,
//! using `thiserror` for ergonomic error handling. Startup failures
//! (session file I/O, malformed session, unsupported schema) are fatal;
//! everything raised while a question is in flight is rendered into the
//! conversation instead.

use thiserror::Error;

/// Main error type for Cir operations
#[derive(Error, Debug)]
pub enum CirError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing credentials for the language-model service
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Persisted session is malformed or structurally invalid
    #[error("Session parse error: {0}")]
    Parse(String),

    /// Session carries a schema tag this build does not know
    #[error("Unsupported session schema version: {0}")]
    UnsupportedSchemaVersion(String),

    /// Undecodable or error-carrying stream event
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Transport failure while opening or reading the response stream
    #[error("Network error: {0}")]
    Network(String),

    /// The in-flight request was cancelled by the user
    #[error("Request cancelled")]
    Cancelled,

    /// External file picker failed to run
    #[error("File picker error: {0}")]
    Picker(String),

    /// Session storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Cir operations
///
/// Uses `anyhow::Error` so context can be attached while propagating;
/// typed failures are recovered with `downcast_ref::<CirError>()`.
pub type Result<T> = anyhow::Result<T>;
