//! Error types for gallery-fetch
//!
//! Errors are split by scope:
//! - [`Error`] covers setup failures that abort a run before or at its start
//!   (bad input, malformed seed URL, unusable destination directory).
//! - [`FetchError`] and [`InvalidImageError`] describe what went wrong with a
//!   single candidate. They never abort a run; the downloader folds them
//!   into an [`Outcome`](crate::types::Outcome).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gallery-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gallery-fetch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration or run-time input error
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the problem
        message: String,
        /// The input or configuration key that caused the error (e.g., "max_images")
        key: Option<String>,
    },

    /// Seed URL does not look like a gallery index page
    #[error("malformed gallery URL {url:?}: {reason}")]
    MalformedUrl {
        /// The URL as supplied
        url: String,
        /// Why the identifier could not be derived
        reason: String,
    },

    /// The destination directory could not be created or used
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        /// The directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// HTTP client could not be constructed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Config`] for a specific input key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Build a [`Error::MalformedUrl`]
    pub fn malformed_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code the CLI uses for this error
    ///
    /// - 2: bad input (config or seed URL)
    /// - 3: destination directory unusable
    /// - 1: anything else
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config { .. } | Error::MalformedUrl { .. } => 2,
            Error::Storage { .. } => 3,
            Error::Network(_) | Error::Io(_) | Error::Serialization(_) => 1,
        }
    }
}

/// Failure to obtain the bytes of one candidate image
///
/// Retryability is decided by [`IsRetryable`](crate::retry::IsRetryable).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server has no resource at this URL (404/410)
    #[error("not found (HTTP {status})")]
    NotFound {
        /// HTTP status code returned
        status: u16,
    },

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established or was reset
    #[error("connection error: {0}")]
    Connect(String),

    /// Any other transport-level failure (body read, protocol error)
    #[error("transport error: {0}")]
    Transport(String),

    /// Server-side or throttling status (5xx, 408, 429)
    #[error("server error (HTTP {status})")]
    ServerError {
        /// HTTP status code returned
        status: u16,
    },

    /// A status code that is neither success, not-found nor transient
    #[error("unexpected status (HTTP {status})")]
    UnexpectedStatus {
        /// HTTP status code returned
        status: u16,
    },

    /// HTTP 200 with a zero-length body
    #[error("empty response body")]
    EmptyBody,

    /// Response is labelled as something other than an image
    #[error("unexpected content type {0:?}")]
    UnexpectedContentType(String),
}

impl FetchError {
    /// Classify a non-success HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            404 | 410 => FetchError::NotFound { status },
            408 | 429 | 500..=599 => FetchError::ServerError { status },
            _ => FetchError::UnexpectedStatus { status },
        }
    }

    /// Map a reqwest transport error onto the fetch taxonomy
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Fetched bytes that do not form a usable image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidImageError {
    /// Zero-length buffer
    #[error("no image data")]
    Empty,

    /// Content does not match any supported image format
    #[error("unrecognized image format")]
    UnknownFormat,

    /// Recognized format but the data stops before the end marker
    #[error("truncated {format} data")]
    Truncated {
        /// Detected format name
        format: String,
    },

    /// Recognized format but the decoder rejected the data
    #[error("corrupt {format} data: {reason}")]
    Decode {
        /// Detected format name
        format: String,
        /// Decoder message
        reason: String,
    },

    /// Decoded dimensions are below the configured minimum
    #[error("image too small ({width}x{height})")]
    TooSmall {
        /// Decoded width in pixels
        width: u32,
        /// Decoded height in pixels
        height: u32,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_input_and_storage_failures() {
        assert_eq!(Error::config("max_images", "must be positive").exit_code(), 2);
        assert_eq!(
            Error::malformed_url("http://x", "missing index.html").exit_code(),
            2
        );
        assert_eq!(
            Error::Storage {
                path: PathBuf::from("/readonly/dest"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            }
            .exit_code(),
            3
        );
        assert_eq!(
            Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom")).exit_code(),
            1
        );
    }

    #[test]
    fn storage_error_message_names_the_path() {
        let err = Error::Storage {
            path: PathBuf::from("/readonly/dest"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let message = err.to_string();
        assert!(message.contains("/readonly/dest"), "got: {message}");
        assert!(message.contains("denied"), "got: {message}");
    }

    #[test]
    fn config_error_keeps_key() {
        match Error::config("max_images", "must be at least 1") {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("max_images"));
                assert_eq!(message, "must be at least 1");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn status_classification() {
        assert_eq!(
            FetchError::from_status(404),
            FetchError::NotFound { status: 404 }
        );
        assert_eq!(
            FetchError::from_status(410),
            FetchError::NotFound { status: 410 }
        );
        assert_eq!(
            FetchError::from_status(503),
            FetchError::ServerError { status: 503 }
        );
        assert_eq!(
            FetchError::from_status(429),
            FetchError::ServerError { status: 429 }
        );
        assert_eq!(
            FetchError::from_status(408),
            FetchError::ServerError { status: 408 }
        );
        assert_eq!(
            FetchError::from_status(403),
            FetchError::UnexpectedStatus { status: 403 }
        );
        assert_eq!(
            FetchError::from_status(301),
            FetchError::UnexpectedStatus { status: 301 }
        );
    }

    #[test]
    fn invalid_image_messages_are_single_line() {
        let errors = [
            InvalidImageError::Empty,
            InvalidImageError::UnknownFormat,
            InvalidImageError::Truncated {
                format: "Jpeg".into(),
            },
            InvalidImageError::Decode {
                format: "Png".into(),
                reason: "bad chunk".into(),
            },
            InvalidImageError::TooSmall {
                width: 0,
                height: 3,
            },
        ];
        for err in errors {
            assert!(!err.to_string().contains('\n'), "{err:?}");
        }
    }
}
