use std::time::Duration;

use thiserror::Error;

use crate::protocol::ErrorCode;

/// Failures surfaced by listing operations. None of them are fatal; every one
/// is recoverable by navigating again.
#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("Timeout fetching directory listing for {path} after {after:?}")]
    Timeout { path: String, after: Duration },

    #[error("Server error {}: {message}", code.as_ref().map(ToString::to_string).unwrap_or_default())]
    Server {
        code: Option<ErrorCode>,
        message: String,
    },

    #[error("No files to download in {path} (folders are skipped)")]
    NoFiles { path: String },

    #[error("Session closed")]
    SessionClosed,

    #[error("Frame of {len} bytes exceeds the size limit")]
    FrameTooLarge { len: usize },

    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowseError {
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type BrowseResult<T> = Result<T, BrowseError>;
