//! Error types for Sable.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Sable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Anything recoverable is a diagnostic, not an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// A required adapter tool or parser backend is missing.
    #[error("Engine unavailable: {reason}")]
    EngineUnavailable {
        /// Why the engine cannot run.
        reason: String,
    },

    /// Unreadable manifest, missing package root, or bad declarations root.
    #[error("Invalid input {path}: {reason}")]
    InputInvalid {
        /// Offending path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Output exceeded the configured limit; the run produced nothing.
    #[error("Output truncated: exceeded {limit} bytes")]
    OutputTruncated {
        /// Limit that was exceeded.
        limit: usize,
    },

    /// An adapter invocation exceeded its time budget.
    #[error("Timed out after {seconds}s")]
    Timeout {
        /// Budget in seconds.
        seconds: u64,
    },

    /// JSON parsing error (manifest, api index, cross-language map).
    #[error("JSON parse error in {file}: {message}")]
    Json {
        /// Path to the file with the error.
        file: PathBuf,
        /// Parser message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled cooperatively. No partial output exists.
    #[error("Operation cancelled")]
    Cancelled,
}
