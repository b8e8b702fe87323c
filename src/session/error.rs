// ABOUTME: Error types for session lifecycle management
// Covers construction failures and the collaborator failures that are logged and recovered

use thiserror::Error;

/// Failures surfaced to callers at construction or configuration time.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A required collaborator was not supplied to the builder.
    #[error("A valid {0} must be provided")]
    MissingCollaborator(&'static str),

    /// The store could not be opened.
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    /// The config file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Session store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record is not valid JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No home directory to store under.
    #[error("No storage directory available")]
    NoStorageDir,
}

/// Event sink failures.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The consumer has gone away.
    #[error("Event sink closed")]
    Closed,

    /// The sink refused the event.
    #[error("Event rejected: {0}")]
    Rejected(String),
}
