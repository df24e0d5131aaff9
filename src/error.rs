use crate::config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a resolution run
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Scan path does not exist: {0}")]
    ScanPathNotFound(PathBuf),
    #[error("Resolution folder is not a valid directory: {0}")]
    InvalidResolutionFolder(PathBuf),
    #[error("Unsupported file type: {0}")]
    UnsupportedArchive(PathBuf),
    #[error("Failed to extract archive {path}: {message}")]
    Archive { path: PathBuf, message: String },
    #[error("Failed to walk {path}: {message}")]
    Discovery { path: PathBuf, message: String },
    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("I/O error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to serialize resolution result: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResolverError {
    pub fn discovery(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ResolverError::Discovery {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ResolverError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn archive(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ResolverError::Archive {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
