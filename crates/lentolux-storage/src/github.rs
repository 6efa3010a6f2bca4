//! GitHub repository contents archive
//!
//! Artifacts are committed to a repository through the contents API:
//! `GET|PUT|DELETE /repos/{owner}/{repo}/contents/{path}`.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use lentolux_core::models::ContentType;
use lentolux_core::Config;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::keys::{self, basename, directory_for, marker_path};
use crate::retry::RetryPolicy;
use crate::traits::{ArchiveError, ArchiveResult, ArchiveStore};
use crate::ArchiveBackend;

const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("lentolux-archive/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Characters escaped inside one path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode each segment of a repository path, keeping the separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone)]
pub struct GitHubArchiveConfig {
    pub api_base_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl GitHubArchiveConfig {
    pub fn from_config(config: &Config) -> ArchiveResult<Self> {
        let token = config
            .github_token()
            .ok_or_else(|| ArchiveError::Config("GITHUB_TOKEN not configured".to_string()))?;
        let (owner, repo) = config
            .github_repo()
            .and_then(|r| r.split_once('/'))
            .ok_or_else(|| {
                ArchiveError::Config("GITHUB_REPO must be set as owner/name".to_string())
            })?;

        Ok(Self {
            api_base_url: config.github_api_url().trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: config.github_branch().to_string(),
            token: token.to_string(),
            timeout: Duration::from_secs(config.archive_timeout_secs()),
            retry: RetryPolicy::new(config.archive_max_attempts()),
        })
    }
}

/// Metadata of a single file entry
#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
    download_url: Option<String>,
}

/// GitHub contents API archive implementation
#[derive(Clone)]
pub struct GitHubArchive {
    client: reqwest::Client,
    config: GitHubArchiveConfig,
}

impl GitHubArchive {
    pub fn new(config: GitHubArchiveConfig) -> ArchiveResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ArchiveError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base_url,
            self.config.owner,
            self.config.repo,
            encode_path(path)
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.contents_url(path))
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn send(builder: RequestBuilder, operation: &str) -> ArchiveResult<Response> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ArchiveError::Transport(format!("{} timed out", operation))
            } else {
                ArchiveError::Transport(format!("{}: {}", operation, e))
            }
        })
    }

    async fn api_error(response: Response) -> ArchiveError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ArchiveError::Api {
            status,
            message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }

    /// Whether anything exists at `path`
    async fn exists_once(&self, path: &str) -> ArchiveResult<bool> {
        let response = Self::send(
            self.request(Method::GET, path)
                .query(&[("ref", self.config.branch.as_str())]),
            "lookup",
        )
        .await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn get_entry_once(&self, path: &str) -> ArchiveResult<ContentEntry> {
        let response = Self::send(
            self.request(Method::GET, path)
                .query(&[("ref", self.config.branch.as_str())]),
            "read entry",
        )
        .await?;

        match response.status() {
            s if s.is_success() => {
                let value: serde_json::Value = response.json().await.map_err(|e| {
                    ArchiveError::Transport(format!("Failed to parse entry metadata: {}", e))
                })?;
                if value.is_array() {
                    return Err(ArchiveError::InvalidPath(format!(
                        "{} is a directory",
                        path
                    )));
                }
                serde_json::from_value(value).map_err(|e| ArchiveError::Api {
                    status: 200,
                    message: format!("Unexpected entry metadata: {}", e),
                })
            }
            StatusCode::NOT_FOUND => Err(ArchiveError::NotFound(path.to_string())),
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Create a file. Never passes a revision, so an existing file is a conflict.
    async fn create_file_once(&self, path: &str, encoded: &str, message: &str) -> ArchiveResult<()> {
        let response = Self::send(
            self.request(Method::PUT, path).json(&json!({
                "message": message,
                "content": encoded,
                "branch": self.config.branch,
            })),
            "create file",
        )
        .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
                Err(ArchiveError::AlreadyExists(path.to_string()))
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Create a file, confirming with a read when the response was lost.
    ///
    /// A timed-out PUT may still have been committed; reporting it as failed
    /// would orphan the entry, and a retry would collide with it.
    async fn create_file_checked(
        &self,
        path: &str,
        encoded: &str,
        message: &str,
    ) -> ArchiveResult<()> {
        match self.create_file_once(path, encoded, message).await {
            Err(ArchiveError::Transport(detail)) => self.confirm_created(path, detail).await,
            other => other,
        }
    }

    async fn confirm_created(&self, path: &str, detail: String) -> ArchiveResult<()> {
        match self.get_entry_once(path).await {
            Ok(_) => {
                tracing::warn!(
                    path = %path,
                    error = %detail,
                    "Create response lost but the entry exists; treating as created"
                );
                Ok(())
            }
            Err(_) => Err(ArchiveError::Transport(detail)),
        }
    }

    async fn delete_file_once(&self, path: &str, sha: &str, message: &str) -> ArchiveResult<()> {
        let response = Self::send(
            self.request(Method::DELETE, path).json(&json!({
                "message": message,
                "sha": sha,
                "branch": self.config.branch,
            })),
            "delete file",
        )
        .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ArchiveError::NotFound(path.to_string())),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn get_entry(&self, path: &str) -> ArchiveResult<ContentEntry> {
        self.config
            .retry
            .run("read entry", || self.get_entry_once(path))
            .await
    }

    /// Make sure the directory exists, creating its marker file when it does not
    async fn ensure_directory(&self, directory: &str) -> ArchiveResult<()> {
        let exists = self
            .config
            .retry
            .run("check directory", || self.exists_once(directory))
            .await?;
        if exists {
            return Ok(());
        }

        let marker = marker_path(directory);
        let created = self
            .config
            .retry
            .run("initialize directory", || {
                self.create_file_checked(&marker, "", "Initialize directory")
            })
            .await;

        match created {
            Ok(()) => {
                tracing::info!(directory = %directory, "Archive directory initialized");
                Ok(())
            }
            // Another upload initialised it first
            Err(ArchiveError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ArchiveStore for GitHubArchive {
    #[tracing::instrument(skip(self), fields(archive.backend = "github"))]
    async fn archive(&self, local_path: &Path, content_type: ContentType) -> ArchiveResult<String> {
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::InvalidPath(local_path.display().to_string()))?;
        let remote_path = keys::archive_path(content_type, name)?;

        let data = tokio::fs::read(local_path).await?;
        let size = data.len();
        let encoded = STANDARD.encode(&data);
        let start = Instant::now();

        self.ensure_directory(directory_for(content_type)).await?;

        let message = format!("Upload {}", name);
        self.config
            .retry
            .run("create file", || {
                self.create_file_checked(&remote_path, &encoded, &message)
            })
            .await?;

        tracing::info!(
            remote_path = %remote_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis() as u64,
            "Artifact archived to GitHub"
        );

        Ok(remote_path)
    }

    #[tracing::instrument(skip(self), fields(archive.backend = "github"))]
    async fn unarchive(&self, remote_path: &str) -> ArchiveResult<()> {
        keys::validate_remote_path(remote_path)?;

        let entry = self.get_entry(remote_path).await?;
        let message = format!("Delete {}", basename(remote_path));
        self.config
            .retry
            .run("delete file", || {
                self.delete_file_once(remote_path, &entry.sha, &message)
            })
            .await?;

        tracing::info!(remote_path = %remote_path, "Archive entry deleted");
        Ok(())
    }

    async fn resolve_download_url(&self, remote_path: &str) -> ArchiveResult<String> {
        keys::validate_remote_path(remote_path)?;

        self.get_entry(remote_path)
            .await?
            .download_url
            .ok_or_else(|| ArchiveError::Api {
                status: 200,
                message: format!("No download url for {}", remote_path),
            })
    }

    fn backend_type(&self) -> ArchiveBackend {
        ArchiveBackend::Github
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    const REPO_PREFIX: &str = "/repos/lentolux/contents/contents/contents/";

    fn archive_for(server: &mockito::ServerGuard) -> GitHubArchive {
        GitHubArchive::new(GitHubArchiveConfig {
            api_base_url: server.url(),
            owner: "lentolux".to_string(),
            repo: "contents".to_string(),
            branch: "main".to_string(),
            token: "test-token".to_string(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::new(3).with_base_delay(Duration::from_millis(1)),
        })
        .unwrap()
    }

    fn directory_matcher() -> Matcher {
        Matcher::Regex(format!(r"^{}[^/?]+(\?.*)?$", REPO_PREFIX))
    }

    fn file_matcher(name: &str) -> Matcher {
        Matcher::Regex(format!(
            r"^{}[^/?]+/{}(\?.*)?$",
            REPO_PREFIX,
            regex_escape(name)
        ))
    }

    fn regex_escape(s: &str) -> String {
        s.replace('.', "\\.")
    }

    async fn artifact(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, b"watermarked bytes").await.unwrap();
        path
    }

    #[test]
    fn test_encode_path_escapes_each_segment() {
        assert_eq!(encode_path("contents/a b/c#d.png"), "contents/a%20b/c%23d.png");
        let encoded = encode_path("contents/작품_소개/x.png");
        assert!(encoded.starts_with("contents/%EC%9E%91"));
        assert!(encoded.ends_with("/x.png"));
    }

    #[tokio::test]
    async fn test_archive_initializes_missing_directory() {
        let mut server = mockito::Server::new_async().await;
        let lookup = server
            .mock("GET", directory_matcher())
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .match_header("authorization", "Bearer test-token")
            .with_status(404)
            .create_async()
            .await;
        let marker = server
            .mock("PUT", file_matcher(".gitkeep"))
            .match_body(Matcher::PartialJson(json!({
                "message": "Initialize directory",
                "branch": "main",
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        let upload = server
            .mock("PUT", file_matcher("photo_watermarked.png"))
            .match_body(Matcher::PartialJson(json!({
                "message": "Upload photo_watermarked.png",
                "content": STANDARD.encode(b"watermarked bytes"),
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "photo_watermarked.png").await;
        let remote = archive_for(&server)
            .archive(&path, ContentType::DailyLife)
            .await
            .unwrap();

        assert_eq!(remote, "contents/감성적_일상_나눔/photo_watermarked.png");
        lookup.assert_async().await;
        marker.assert_async().await;
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_archive_skips_marker_for_existing_directory() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", directory_matcher())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let marker = server
            .mock("PUT", file_matcher(".gitkeep"))
            .expect(0)
            .create_async()
            .await;
        let upload = server
            .mock("PUT", file_matcher("clip_watermarked.mp4"))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "clip_watermarked.mp4").await;
        let remote = archive_for(&server)
            .archive(&path, ContentType::Interview)
            .await
            .unwrap();

        assert_eq!(remote, "contents/감성_인터뷰/clip_watermarked.mp4");
        marker.assert_async().await;
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_archive_collision_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", directory_matcher())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let upload = server
            .mock("PUT", file_matcher("dup.png"))
            .with_status(422)
            .with_body(r#"{"message":"sha wasn't supplied"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "dup.png").await;
        let err = archive_for(&server)
            .archive(&path, ContentType::Artistic)
            .await
            .unwrap_err();

        assert!(matches!(err, ArchiveError::AlreadyExists(_)));
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_retried_up_to_limit() {
        let mut server = mockito::Server::new_async().await;
        let lookup = server
            .mock("GET", directory_matcher())
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .expect(3)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = artifact(&dir, "x.png").await;
        let err = archive_for(&server)
            .archive(&path, ContentType::Philosophy)
            .await
            .unwrap_err();

        assert!(matches!(err, ArchiveError::Api { status: 503, .. }));
        lookup.assert_async().await;
    }

    #[tokio::test]
    async fn test_unarchive_deletes_with_revision() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", file_matcher("old.png"))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"sha":"abc123","download_url":"https://raw.example/old.png"}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", file_matcher("old.png"))
            .match_body(Matcher::PartialJson(json!({
                "message": "Delete old.png",
                "sha": "abc123",
                "branch": "main",
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        archive_for(&server)
            .unarchive("contents/작품_소개/old.png")
            .await
            .unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_unarchive_missing_entry_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", file_matcher("gone.png"))
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = archive_for(&server)
            .unarchive("contents/작품_소개/gone.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_download_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", file_matcher("a_watermarked.png"))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"sha":"s","download_url":"https://raw.githubusercontent.com/lentolux/contents/main/contents/x/a_watermarked.png"}"#,
            )
            .create_async()
            .await;

        let url = archive_for(&server)
            .resolve_download_url("contents/감성적_일상_나눔/a_watermarked.png")
            .await
            .unwrap();
        assert!(url.ends_with("/a_watermarked.png"));
    }

    #[tokio::test]
    async fn test_lost_create_response_confirmed_by_read() {
        let mut server = mockito::Server::new_async().await;
        let read = server
            .mock("GET", file_matcher("late_watermarked.png"))
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .with_status(200)
            .with_body(r#"{"sha":"f00d","download_url":null}"#)
            .expect(1)
            .create_async()
            .await;

        archive_for(&server)
            .confirm_created(
                "contents/감성적_일상_나눔/late_watermarked.png",
                "create file timed out".to_string(),
            )
            .await
            .unwrap();
        read.assert_async().await;
    }

    #[tokio::test]
    async fn test_lost_create_without_entry_stays_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", file_matcher("never.png"))
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = archive_for(&server)
            .confirm_created("contents/감성_인터뷰/never.png", "create file timed out".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Transport(ref d) if d == "create file timed out"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_remote_path_rejected_without_request() {
        let server = mockito::Server::new_async().await;
        let err = archive_for(&server)
            .unarchive("../etc/passwd")
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPath(_)));
    }
}
