//! Error types for the sync engine with retry classification

use std::path::PathBuf;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while enumerating, fetching or committing assets
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport-level failure talking to the server
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Server returned {status} for '{url}'")]
    HttpStatus {
        url: String,
        status: StatusCode,
    },

    /// Network timeout
    #[error("Request to '{url}' timed out after {duration_secs}s")]
    NetworkTimeout {
        url: String,
        duration_secs: u64,
    },

    /// Body ended before the advertised content length was received
    #[error("Truncated body from '{url}': expected {expected} bytes, received {received}")]
    TruncatedBody {
        url: String,
        expected: u64,
        received: u64,
    },

    /// File system I/O errors with file context
    #[error("File operation failed on '{path}' while {operation}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// URL could not be parsed or joined
    #[error("Invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Two catalog entries resolve to the same destination
    #[error("Duplicate download target for '{path}'")]
    DuplicateTarget {
        path: PathBuf,
    },

    /// Misconfiguration that must abort the run before any worker starts
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Stop was requested while the operation was in flight
    #[error("Download cancelled")]
    Cancelled {
        url: Option<String>,
    },
}

/// How a failure should be treated by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Expected to go away on retry (timeouts, resets, 5xx)
    Transient,
    /// Retrying cannot help (4xx, permissions, disk full)
    Permanent,
    /// The user asked us to stop; not a failure
    Cancelled,
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Move,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Metadata => write!(f, "reading metadata"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl DownloadError {
    /// Wrap a reqwest error, promoting timeouts and status errors to their own variants
    pub fn http(url: impl Into<String>, error: reqwest::Error) -> Self {
        let url = url.into();
        if error.is_timeout() {
            DownloadError::NetworkTimeout { url, duration_secs: 0 }
        } else if let Some(status) = error.status() {
            DownloadError::HttpStatus { url, status }
        } else {
            DownloadError::HttpRequest { url, source: error }
        }
    }

    pub fn file_system(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        DownloadError::FileSystem { path: path.into(), operation, source }
    }

    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        DownloadError::Configuration {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    /// Classify the error for the retry policy
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            DownloadError::HttpRequest { source, .. } => {
                if source.is_builder() || source.is_redirect() {
                    FailureKind::Permanent
                } else {
                    // connect, reset, body and decode errors
                    FailureKind::Transient
                }
            }
            DownloadError::HttpStatus { status, .. } => status_kind(*status),
            DownloadError::NetworkTimeout { .. } => FailureKind::Transient,
            DownloadError::TruncatedBody { .. } => FailureKind::Transient,
            DownloadError::FileSystem { source, .. } => io_kind(source.kind()),
            DownloadError::InvalidUrl { .. } => FailureKind::Permanent,
            DownloadError::DuplicateTarget { .. } => FailureKind::Permanent,
            DownloadError::Configuration { .. } => FailureKind::Permanent,
            DownloadError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    /// Check if error is recoverable (should retry)
    pub fn is_recoverable(&self) -> bool {
        self.failure_kind() == FailureKind::Transient
    }

    /// Error message followed by its chain of causes, for summaries
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }

    /// Short category name for log fields
    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::HttpRequest { .. } => "http_request",
            DownloadError::HttpStatus { .. } => "http_status",
            DownloadError::NetworkTimeout { .. } => "network_timeout",
            DownloadError::TruncatedBody { .. } => "truncated_body",
            DownloadError::FileSystem { .. } => "file_system",
            DownloadError::InvalidUrl { .. } => "invalid_url",
            DownloadError::DuplicateTarget { .. } => "duplicate_target",
            DownloadError::Configuration { .. } => "configuration",
            DownloadError::Cancelled { .. } => "cancelled",
        }
    }
}

/// 5xx, 408 and 429 are worth another try; every other status is final
pub fn status_kind(status: StatusCode) -> FailureKind {
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        FailureKind::Transient
    } else {
        FailureKind::Permanent
    }
}

fn io_kind(kind: std::io::ErrorKind) -> FailureKind {
    use std::io::ErrorKind;

    match kind {
        ErrorKind::Interrupted
        | ErrorKind::TimedOut
        | ErrorKind::WouldBlock
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::UnexpectedEof => FailureKind::Transient,
        // permission denied, storage full, read-only fs and the rest are local and final
        _ => FailureKind::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn server_errors_are_transient() {
        for code in [500u16, 502, 503, 504, 408, 429] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(status_kind(status), FailureKind::Transient, "status {code}");
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for code in [400u16, 401, 403, 404, 410] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(status_kind(status), FailureKind::Permanent, "status {code}");
        }
    }

    #[test]
    fn local_disk_errors_are_permanent() {
        let denied = DownloadError::file_system(
            "/tmp/x",
            FileOperation::Create,
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(denied.failure_kind(), FailureKind::Permanent);
        assert!(!denied.is_recoverable());
        assert!(denied.describe().starts_with("File operation failed on '/tmp/x' while creating: "));

        let full = DownloadError::file_system(
            "/tmp/x",
            FileOperation::Write,
            io::Error::from(io::ErrorKind::StorageFull),
        );
        assert_eq!(full.failure_kind(), FailureKind::Permanent);
    }

    #[test]
    fn interrupted_io_and_truncation_are_transient() {
        let interrupted = DownloadError::file_system(
            "/tmp/x",
            FileOperation::Write,
            io::Error::from(io::ErrorKind::Interrupted),
        );
        assert!(interrupted.is_recoverable());

        let truncated = DownloadError::TruncatedBody {
            url: "http://host/a.webp".into(),
            expected: 10,
            received: 4,
        };
        assert!(truncated.is_recoverable());
        assert_eq!(truncated.category(), "truncated_body");
        assert_eq!(truncated.describe(), truncated.to_string());
    }

    #[test]
    fn cancellation_is_its_own_kind() {
        let err = DownloadError::Cancelled { url: None };
        assert_eq!(err.failure_kind(), FailureKind::Cancelled);
        assert!(!err.is_recoverable());
    }
}
