//! Error types for mirror operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while mirroring a prefix.
///
/// Only [`MirrorError::Listing`] aborts a run. Every other variant is raised
/// for a single object and ends up as an [`ObjectFailure`](crate::ObjectFailure)
/// in the run report.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// I/O error during file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// JSON serialization error.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// The bucket listing failed.
    #[error("Failed to list s3://{bucket}/{prefix}: {message}")]
    Listing {
        bucket: String,
        prefix: String,
        message: String,
    },

    /// Reading the object's metadata failed.
    #[error("Failed to read metadata for '{key}': {message}")]
    Head { key: String, message: String },

    /// The restore request was rejected.
    #[error("Failed to request restore for '{key}': {message}")]
    Restore { key: String, message: String },

    /// Fetching or streaming the object body failed.
    #[error("Failed to fetch '{key}': {message}")]
    Get { key: String, message: String },

    /// The body ended before the size reported by the head request.
    #[error("Size mismatch for '{key}': expected {expected} bytes, got {actual} bytes")]
    SizeMismatch { key: String, expected: u64, actual: u64 },

    /// The key would resolve outside the destination root.
    #[error("Refusing to write '{key}' outside the destination directory")]
    UnsafeKey { key: String },

    /// The downloaded bytes do not match the object's ETag.
    #[error("MD5 mismatch for '{key}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    /// Invalid client or run configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
