//! Error types for icsport.

use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that can occur while converting or delivering events.
#[derive(Error, Debug)]
pub enum IcsPortError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Interchange error on line {line}: {message}")]
    Interchange { line: usize, message: String },

    #[error("Checkpoint file {} is corrupt: {content:?}", path.display())]
    CorruptCheckpoint { path: PathBuf, content: String },

    #[error("Alias store error: {0}")]
    AliasStore(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Delivery stopped at event #{index} ({ical_uid}): {source}")]
    DeliveryStopped {
        index: usize,
        ical_uid: String,
        #[source]
        source: RemoteError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for icsport operations.
pub type IcsPortResult<T> = Result<T, IcsPortError>;
