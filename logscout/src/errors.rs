/// Error types for logscout.
///
/// Errors fall into two groups. Per-file failures (missing file, permission
/// denied, an oversized line, undecodable bytes) are reported inside a
/// `FileUpdate` event and never stop the run. Setup failures (bad pattern,
/// bad configuration) are returned before any worker starts.
///
/// Events must stay cheap to clone and `Send`, so an error attached to an
/// event is wrapped in an `Arc`:
/// ```rust,ignore
/// match update.error.as_deref() {
///     Some(ScanError::FileNotFound(path)) => // render as missing,
///     Some(e) => // render as failed,
///     None => // success
/// }
/// ```
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while preparing or running a scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Line {line} of {path} exceeds the {limit} byte line limit")]
    LineTooLong {
        path: PathBuf,
        line: u64,
        limit: usize,
    },
    #[error("Invalid UTF-8 on line {line} of {path}")]
    EncodingError { path: PathBuf, line: u64 },
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Scan cancelled")]
    Cancelled,
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl ScanError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn line_too_long(path: impl Into<PathBuf>, line: u64, limit: usize) -> Self {
        Self::LineTooLong {
            path: path.into(),
            line,
            limit,
        }
    }

    pub fn encoding_error(path: impl Into<PathBuf>, line: u64) -> Self {
        Self::EncodingError {
            path: path.into(),
            line,
        }
    }

    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn worker_pool(msg: impl Into<String>) -> Self {
        Self::WorkerPool(msg.into())
    }

    /// Maps an I/O error raised while opening or reading `path` onto the
    /// dedicated variants where one exists.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::file_not_found(path),
            io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }
}
