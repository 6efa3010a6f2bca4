use std::path::PathBuf;

use async_trait::async_trait;
use lentolux_core::models::{weekly_schedule, Content, ContentType, MediaKind};
use thiserror::Error;
use uuid::Uuid;

/// Errors from a single platform call
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("platform rejected post ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("media file missing: {0}")]
    MissingMedia(String),

    #[error("failed to read media: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformError::Transport(_) | PlatformError::Timeout(_) => true,
            PlatformError::Rejected { status, .. } => *status == 429 || *status >= 500,
            PlatformError::MissingMedia(_) | PlatformError::Io(_) => false,
        }
    }
}

/// What gets pushed to a platform
#[derive(Debug, Clone)]
pub struct SocialPost {
    pub content_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content_type: ContentType,
    pub media_kind: MediaKind,
    /// Weekly slot hashtag for the content type
    pub hashtag: Option<String>,
    pub media_path: PathBuf,
    pub archive_path: String,
}

impl SocialPost {
    pub fn from_content(content: &Content) -> Self {
        let hashtag = weekly_schedule()
            .into_iter()
            .find(|entry| entry.content_type == content.content_type)
            .map(|entry| entry.hashtag.to_string());

        Self {
            content_id: content.id,
            title: content.title.clone(),
            description: content.description.clone(),
            content_type: content.content_type,
            media_kind: content.media_type,
            hashtag,
            media_path: PathBuf::from(&content.file_path),
            archive_path: content.github_path.clone(),
        }
    }

    /// Caption text: description followed by the slot hashtag
    pub fn caption(&self) -> String {
        match (self.description.as_deref(), self.hashtag.as_deref()) {
            (Some(d), Some(h)) if !d.trim().is_empty() => format!("{}\n\n{}", d.trim(), h),
            (Some(d), None) => d.trim().to_string(),
            (_, Some(h)) => h.to_string(),
            (_, None) => String::new(),
        }
    }
}

/// A destination the publisher can push posts to
#[async_trait]
pub trait SocialPlatform: Send + Sync {
    fn name(&self) -> &str;

    /// Publish one post. Returns the public URL of the post when the platform reports one.
    async fn publish(&self, post: &SocialPost) -> Result<Option<String>, PlatformError>;
}
