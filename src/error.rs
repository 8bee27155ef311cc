//! Error types for dupscan
//!
//! This module defines the error hierarchy for the crate:
//! - Configuration and CLI validation errors
//! - Scheduler / worker-thread startup errors
//! - Hashing errors (per-file, recoverable by dropping the candidate)
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors carry the offending path or limit so messages are actionable
//! - Per-file and per-directory failures never abort a run; only root-level
//!   failures (unreadable root, uncreatable output) surface to the caller

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the dupscan application
#[derive(Error, Debug)]
pub enum DupscanError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scheduler errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// I/O errors (root stat, output file, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Failed to create the output file
    #[error("Failed to create output at '{path}': {source}")]
    CreateOutputFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Scheduler and worker-thread errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Thread spawn failed
    #[error("Failed to spawn thread '{name}': {source}")]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },
}

/// Per-file hashing errors
///
/// These are always recoverable: a file that cannot be fully read cannot be
/// asserted to be a duplicate, so the candidate is dropped with a warning.
#[derive(Error, Debug)]
pub enum HashError {
    /// File could not be opened
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Read failed mid-stream
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Fewer bytes than the recorded size were read
    #[error("Partial read of '{path}': expected {expected} bytes, read {read}")]
    ShortRead {
        path: PathBuf,
        expected: u64,
        read: u64,
    },
}

/// Result type alias for DupscanError
pub type Result<T> = std::result::Result<T, DupscanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let cfg_err = ConfigError::InvalidWorkerCount { count: 0, max: 512 };
        let err: DupscanError = cfg_err.into();
        assert!(matches!(err, DupscanError::Config(_)));
    }

    #[test]
    fn test_short_read_message() {
        let err = HashError::ShortRead {
            path: PathBuf::from("/data/a"),
            expected: 100,
            read: 60,
        };
        let msg = err.to_string();
        assert!(msg.contains("/data/a"));
        assert!(msg.contains("100"));
        assert!(msg.contains("60"));
    }
}
