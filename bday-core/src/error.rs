//! Error types for the bday ecosystem.

use thiserror::Error;

/// Errors that can occur in bday operations.
#[derive(Error, Debug)]
pub enum BdayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("'{path}' has {count} invalid line(s):\n{details}")]
    InvalidInput {
        path: String,
        count: usize,
        details: String,
    },

    #[error("{source_name} contains events with duplicate signatures:\n{details}")]
    DuplicateSignatures {
        source_name: String,
        details: String,
    },

    #[error("Event '{0}' came from the remote calendar and carries no settings to upload")]
    RemoteOnly(String),

    #[error("Malformed remote event: {0}")]
    MalformedRemote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bday operations.
pub type BdayResult<T> = Result<T, BdayError>;
