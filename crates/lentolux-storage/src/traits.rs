//! Archive store abstraction trait
//!
//! Every archive backend (GitHub repository contents, local filesystem)
//! implements [`ArchiveStore`], so the pipeline never couples to one remote.

use std::path::Path;

use async_trait::async_trait;
use lentolux_core::models::ContentType;
use lentolux_core::{AppError, ArchiveBackend};
use thiserror::Error;

/// Archive operation errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("archive api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("archive entry not found: {0}")]
    NotFound(String),

    #[error("archive entry already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid archive path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ArchiveError {
    /// Transport failures, timeouts, rate limits and 5xx responses are worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ArchiveError::Transport(_) => true,
            ArchiveError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound(path) => {
                AppError::NotFound(format!("Archive entry not found: {}", path))
            }
            other => AppError::Archive(other.to_string()),
        }
    }
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Archive store abstraction trait
///
/// Remote paths returned by [`ArchiveStore::archive`] have the form
/// `contents/{directory}/{basename}`; see the `keys` module.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Push a local artifact under the directory of `content_type` and return its remote path.
    ///
    /// Never overwrites: an existing entry with the same basename is an error.
    async fn archive(&self, local_path: &Path, content_type: ContentType) -> ArchiveResult<String>;

    /// Delete an archived entry
    async fn unarchive(&self, remote_path: &str) -> ArchiveResult<()>;

    /// Resolve a URL the artifact can be downloaded from
    async fn resolve_download_url(&self, remote_path: &str) -> ArchiveResult<String>;

    /// Get the archive backend type
    fn backend_type(&self) -> ArchiveBackend;
}
