#[cfg(feature = "archive-github")]
use crate::{GitHubArchive, GitHubArchiveConfig};
#[cfg(feature = "archive-local")]
use crate::LocalArchive;
use crate::{ArchiveBackend, ArchiveError, ArchiveResult, ArchiveStore};
use lentolux_core::Config;
use std::sync::Arc;

/// Create an archive backend based on configuration
pub async fn create_archive(config: &Config) -> ArchiveResult<Arc<dyn ArchiveStore>> {
    match config.archive_backend() {
        #[cfg(feature = "archive-github")]
        ArchiveBackend::Github => {
            let archive = GitHubArchive::new(GitHubArchiveConfig::from_config(config)?)?;
            Ok(Arc::new(archive))
        }

        #[cfg(not(feature = "archive-github"))]
        ArchiveBackend::Github => Err(ArchiveError::Config(
            "GitHub archive backend not available (archive-github feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "archive-local")]
        ArchiveBackend::Local => {
            let base_path = config.local_archive_path().ok_or_else(|| {
                ArchiveError::Config("LOCAL_ARCHIVE_PATH not configured".to_string())
            })?;
            let base_url = config.local_archive_base_url().ok_or_else(|| {
                ArchiveError::Config("LOCAL_ARCHIVE_BASE_URL not configured".to_string())
            })?;

            let archive = LocalArchive::new(base_path, base_url.to_string()).await?;
            Ok(Arc::new(archive))
        }

        #[cfg(not(feature = "archive-local"))]
        ArchiveBackend::Local => Err(ArchiveError::Config(
            "Local archive backend not available (archive-local feature not enabled)".to_string(),
        )),
    }
}
