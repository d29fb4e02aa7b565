//! Library error type

use thiserror::Error;

/// Errors surfaced by configuration loading and feedback plumbing
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Feedback upload failed: {0}")]
    Feedback(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
