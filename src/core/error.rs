//! Error types for log parsing and log sources.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while interpreting a single log line. Never fatal: callers skip the line.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed timestamp prefix: {line:?}")]
    MalformedTimestamp { line: String },

    #[error("pattern {pattern} matched without capture {field}")]
    MissingCapture {
        pattern: &'static str,
        field: &'static str,
    },
}

/// Errors from the log file collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open log file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read log file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan log directory {path}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
