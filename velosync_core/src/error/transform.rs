//! Transform pipeline error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the decode → patch → encode pipeline
///
/// All of these are fatal for the activity being processed: the binary
/// content is deterministic, so retrying without a different input cannot
/// change the outcome.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The codec failed to decode the binary activity file
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The codec failed to re-encode the patched tabular form
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// The tabular output did not carry the expected column labels
    #[error("Unexpected tabular schema: {message}")]
    SchemaMismatch { message: String },

    /// A target row was too short to hold a referenced field
    #[error("Malformed row {row}: {message}")]
    MalformedRow { row: usize, message: String },
}

impl TransformError {
    /// Create a decode error
    pub fn decode(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create an encode error
    pub fn encode(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Encode {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a malformed row error
    pub fn malformed_row(row: usize, message: impl Into<String>) -> Self {
        Self::MalformedRow {
            row,
            message: message.into(),
        }
    }
}
