//! Error types shared by the library modules.
//!
//! Variants follow the four failure families the pipeline distinguishes:
//! validation, I/O, process and not-found. Build and run operations never let
//! these escape to callers; they are turned into log lines and an error status
//! by the orchestrator.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BentoError {
    /// Caller supplied something the operation refuses (existing project
    /// directory, import target without project markers, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// File system failure with the offending path attached
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Spawn failure, rejected command or non-zero exit
    #[error("Process error: {0}")]
    Process(String),

    /// Missing file or directory
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Local static server could not bind or serve
    #[error("Server error: {0}")]
    Server(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = BentoError> = std::result::Result<T, E>;

impl BentoError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }
}

/// Extension trait for attaching a path to `io::Error` results.
pub trait ResultExt<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BentoError::NotFound(path.as_ref().to_path_buf())
            } else {
                BentoError::io(path.as_ref(), e)
            }
        })
    }
}
