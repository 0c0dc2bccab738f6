use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while obtaining blame for a document.
///
/// None of these reach the user: the session turns every failure into
/// "no blame shown" for the affected file.
#[derive(Debug, Error)]
pub enum BlameError {
    #[error("Failed to start git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git blame exited with {code:?}: {stderr}")]
    GitFailed { code: Option<i32>, stderr: String },

    #[error("git blame output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("Path has no parent directory or file name: {0}")]
    InvalidPath(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, BlameError>;
