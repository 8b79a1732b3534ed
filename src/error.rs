// Error types for the library core
// Per-file failures degrade to defaults; only these reach a caller

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single tag read failed. Only `Transient` is worth another attempt.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file not ready: {0}")]
    Transient(#[source] io::Error),

    #[error("unreadable tags: {0}")]
    Permanent(String),
}

impl ExtractError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractError::Transient(_))
    }
}

impl From<io::Error> for ExtractError {
    fn from(err: io::Error) -> Self {
        if is_transient_io(&err) {
            ExtractError::Transient(err)
        } else {
            ExtractError::Permanent(err.to_string())
        }
    }
}

impl From<id3::Error> for ExtractError {
    fn from(err: id3::Error) -> Self {
        match err.kind {
            id3::ErrorKind::Io(io_err) => ExtractError::from(io_err),
            _ => ExtractError::Permanent(err.description),
        }
    }
}

/// Busy or not-yet-there: the state of a file that is still being copied in.
fn is_transient_io(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    if matches!(err.raw_os_error(), Some(32) | Some(33)) {
        return true;
    }

    matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::ResourceBusy
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
    )
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("library directory unavailable: {path}: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {path} into the library: {source}")]
    Ingest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a supported audio file: {0}")]
    Unsupported(PathBuf),

    #[error("invalid library file name: {0:?}")]
    InvalidName(String),

    #[error("filesystem watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("seek failed: {0}")]
    Seek(String),
}

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("resume state I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("resume state is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}
