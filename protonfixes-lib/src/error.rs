//! Error types for protonfixes

use thiserror::Error;

/// Protonfixes result type
pub type Result<T> = std::result::Result<T, ProtonfixesError>;

/// Main error type for protonfixes operations
#[derive(Error, Debug)]
pub enum ProtonfixesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Proton error: {0}")]
    Proton(String),

    #[error("Fix error: {0}")]
    Fix(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: String, got: String },

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
