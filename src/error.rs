//! Error types for Ragbridge
//!
//! This module defines the crate-level error type, using `thiserror` for
//! ergonomic error handling. Controller operations do not surface these to
//! their callers; they are converted to [`crate::client::OperationError`] at
//! the operation boundary and reported through the view.

use thiserror::Error;

/// Main error type for Ragbridge operations
///
/// Covers configuration loading, gateway startup, outbound transport
/// failures, failed one-shot commands, and credential storage.
#[derive(Error, Debug)]
pub enum RagbridgeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Gateway startup or serving errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Outbound request failed before a response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// A controller operation finished with a reported failure
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Credential store read/write errors
    #[error("Credential store error: {0}")]
    CredentialStore(String),

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

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for Ragbridge operations
///
/// Uses `anyhow::Error` so callers can attach context while propagating.
pub type Result<T> = anyhow::Result<T>;
