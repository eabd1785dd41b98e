//! Error types for throttle-probe

use thiserror::Error;

/// Errors raised while probing a target or setting up a run.
///
/// Only [`ProbeError::Config`] ever reaches the caller of a run. Everything
/// else is counted against the worker that hit it and logged.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Invalid run configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection, TLS or protocol failure from the HTTP client
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be read to the end
    #[error("body read error: {0}")]
    Body(String),

    /// A worker task did not complete (panicked or was cancelled)
    #[error("worker join error: {0}")]
    Join(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProbeError>;
