use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use lentolux_core::models::ContentType;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::keys::{self, basename, directory_for, marker_path};
use crate::traits::{ArchiveError, ArchiveResult, ArchiveStore};
use crate::ArchiveBackend;

/// Everything except RFC 3986 unreserved characters
const URL_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Local filesystem archive, mirroring the repository layout under a base directory
#[derive(Clone)]
pub struct LocalArchive {
    base_path: PathBuf,
    base_url: String,
}

impl LocalArchive {
    /// Create a new LocalArchive instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory of the archive (e.g., "/var/lib/lentolux/archive")
    /// * `base_url` - Base URL the archive is served from (e.g., "http://localhost:8000/archive")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> ArchiveResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            ArchiveError::Config(format!(
                "Failed to create archive directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalArchive {
            base_path,
            base_url,
        })
    }

    /// Convert a remote path to a filesystem path below the base directory
    fn remote_to_path(&self, remote_path: &str) -> ArchiveResult<PathBuf> {
        keys::validate_remote_path(remote_path)?;
        Ok(self.base_path.join(remote_path))
    }

    fn generate_url(&self, remote_path: &str) -> String {
        let encoded: Vec<String> = remote_path
            .split('/')
            .map(|segment| utf8_percent_encode(segment, URL_SEGMENT).to_string())
            .collect();
        format!("{}/{}", self.base_url.trim_end_matches('/'), encoded.join("/"))
    }

    async fn ensure_directory(&self, directory: &str) -> ArchiveResult<()> {
        let dir_path = self.base_path.join(directory);
        if fs::try_exists(&dir_path).await.unwrap_or(false) {
            return Ok(());
        }
        fs::create_dir_all(&dir_path).await?;
        fs::write(self.base_path.join(marker_path(directory)), b"").await?;
        tracing::info!(directory = %directory, "Archive directory initialized");
        Ok(())
    }
}

#[async_trait]
impl ArchiveStore for LocalArchive {
    async fn archive(&self, local_path: &Path, content_type: ContentType) -> ArchiveResult<String> {
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::InvalidPath(local_path.display().to_string()))?;
        let remote_path = keys::archive_path(content_type, name)?;
        let target = self.remote_to_path(&remote_path)?;
        let start = Instant::now();

        self.ensure_directory(directory_for(content_type)).await?;

        let data = fs::read(local_path).await?;
        let size = data.len();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => ArchiveError::AlreadyExists(remote_path.clone()),
                _ => ArchiveError::Io(e),
            })?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        tracing::info!(
            path = %target.display(),
            remote_path = %remote_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifact archived locally"
        );

        Ok(remote_path)
    }

    async fn unarchive(&self, remote_path: &str) -> ArchiveResult<()> {
        let path = self.remote_to_path(remote_path)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(
                    remote_path = %remote_path,
                    basename = basename(remote_path),
                    "Local archive entry deleted"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArchiveError::NotFound(remote_path.to_string()))
            }
            Err(e) => Err(ArchiveError::Io(e)),
        }
    }

    async fn resolve_download_url(&self, remote_path: &str) -> ArchiveResult<String> {
        let path = self.remote_to_path(remote_path)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ArchiveError::NotFound(remote_path.to_string()));
        }
        Ok(self.generate_url(remote_path))
    }

    fn backend_type(&self) -> ArchiveBackend {
        ArchiveBackend::Local
    }
}
