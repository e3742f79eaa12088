//! Error types for the spin core

use std::path::PathBuf;

/// Errors produced while configuring the viewer or planning frame-set migrations
#[derive(Debug, thiserror::Error)]
pub enum SpinError {
    #[error("invalid viewer config: {0}")]
    InvalidConfig(String),

    #[error("frame number {number} is claimed by both {first} and {second}")]
    DuplicateFrame {
        number: u32,
        first: String,
        second: String,
    },

    #[error("unrecognized frame file name: {0}")]
    UnrecognizedFrameName(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SpinError>;
