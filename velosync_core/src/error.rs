//! Error types for the VeloSync core library
//!
//! Errors are organized into categories matching the failure surfaces of
//! the pipeline: local I/O, platform transfer, the device-identity
//! transform, and configuration validation.

use thiserror::Error;

pub mod io;
pub mod transfer;
pub mod transform;
pub mod validation;

pub use self::io::{IoError, IoErrorKind};
pub use self::transfer::TransferError;
pub use self::transform::TransformError;
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the VeloSync core library
#[derive(Error, Debug)]
pub enum Error {
    /// Local file system errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Source/destination platform errors
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Decode/patch/encode pipeline errors
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Configuration and input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Whether this error is the destination's "already uploaded" signal
    pub fn is_upload_conflict(&self) -> bool {
        matches!(self, Error::Transfer(TransferError::UploadConflict))
    }
}

// Conversions from external error types

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

impl From<csv::Error> for Error {
    fn from(source: csv::Error) -> Self {
        let message = source.to_string();
        match source.into_kind() {
            csv::ErrorKind::Io(io_err) => Self::Io(IoError::from_std(io_err)),
            _ => Self::Transform(TransformError::schema_mismatch(message)),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        let platform = source
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("platform")
            .to_string();

        if source.is_timeout() || source.is_connect() {
            Self::Transfer(TransferError::Connection {
                platform,
                message: source.to_string(),
            })
        } else if let Some(status) = source.status() {
            Self::Transfer(TransferError::Server {
                platform,
                status: status.as_u16(),
                message: source.to_string(),
            })
        } else {
            Self::Transfer(TransferError::Connection {
                platform,
                message: source.to_string(),
            })
        }
    }
}
