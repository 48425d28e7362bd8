//! Error types for bosstimer-core

use thiserror::Error;

/// Result type alias using bosstimer-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bosstimer-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Backup text that cannot be decoded into a payload: wrong envelope
    /// shape, bad base64, failed decompression, or unparseable JSON
    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    /// Backup written by a format version this build does not support
    #[error("Unsupported backup version: {0}")]
    UnsupportedVersion(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
