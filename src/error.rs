//! Error types for pocketchat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for pocketchat operations
///
/// Covers configuration loading, key-value storage, provider requests,
/// streaming responses, and the interactive front-end.
#[derive(Error, Debug)]
pub enum PocketchatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key-value storage errors (open, read, write, flush)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Provider-related errors (request construction, HTTP status)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Error reported inside a streamed response
    #[error("Stream error: {0}")]
    Stream(String),

    /// Submit was called with no draft and no pending user message
    #[error("Nothing to submit: the draft is empty and no user message is pending")]
    NothingToSubmit,

    /// A conversation cannot be started from an empty message
    #[error("Message cannot be empty")]
    EmptyMessage,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Line editor errors from the interactive loop
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Result type alias for pocketchat operations
///
/// Uses `anyhow::Error` as the error type so call sites can attach context
/// while still downcasting to [`PocketchatError`] when needed.
pub type Result<T> = anyhow::Result<T>;
