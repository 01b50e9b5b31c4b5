//! Platform transfer error types
//!
//! Errors raised while talking to the source (Zwift) and destination
//! (Garmin Connect) platforms. The taxonomy is deliberately flat: every
//! variant except [`TransferError::UploadConflict`] is fatal for the run,
//! and no retry or backoff is defined.

use thiserror::Error;

/// Errors from the source and destination platform clients
#[derive(Error, Debug)]
pub enum TransferError {
    /// Credentials were rejected by the platform
    #[error("Authentication with {platform} failed: {message}")]
    Authentication { platform: String, message: String },

    /// The platform refused the request due to rate limiting
    #[error("{platform} rate limit exceeded: {message}")]
    RateLimited { platform: String, message: String },

    /// Network-level failure reaching the platform
    #[error("Connection to {platform} failed: {message}")]
    Connection { platform: String, message: String },

    /// The destination already has this activity (HTTP 409). Treated as a
    /// success-equivalent outcome by the processor, never surfaced as fatal.
    #[error("Activity already exists on the destination platform")]
    UploadConflict,

    /// Upload rejected for any reason other than a conflict
    #[error("Upload failed with status {status}: {message}")]
    Upload { status: u16, message: String },

    /// Unexpected platform API response
    #[error("{platform} API error: {status} - {message}")]
    Server {
        platform: String,
        status: u16,
        message: String,
    },
}

impl TransferError {
    /// Create an authentication error
    pub fn authentication(platform: &str, message: impl Into<String>) -> Self {
        Self::Authentication {
            platform: platform.to_string(),
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(platform: &str, message: impl Into<String>) -> Self {
        Self::RateLimited {
            platform: platform.to_string(),
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(platform: &str, message: impl Into<String>) -> Self {
        Self::Connection {
            platform: platform.to_string(),
            message: message.into(),
        }
    }

    /// Create a server error with status and message
    pub fn server(platform: &str, status: u16, message: &str) -> Self {
        Self::Server {
            platform: platform.to_string(),
            status,
            message: message.to_string(),
        }
    }

    /// Whether this error means the activity is already on the destination
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::UploadConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_not_confused_with_upload_failure() {
        assert!(TransferError::UploadConflict.is_conflict());
        assert!(
            !TransferError::Upload {
                status: 500,
                message: "boom".into()
            }
            .is_conflict()
        );
    }

    #[test]
    fn test_server_error_display() {
        let error = TransferError::server("zwift", 503, "unavailable");
        assert!(error.to_string().contains("503"));
        assert!(error.to_string().contains("unavailable"));
    }
}
