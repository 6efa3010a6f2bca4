use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Editorial category of a content item (one of five fixed themes).
///
/// Accepts the Korean theme labels as aliases on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "content_category", rename_all = "snake_case")
)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    #[serde(alias = "감성적_일상_나눔")]
    DailyLife,
    #[serde(alias = "예술적_취향_나눔")]
    Artistic,
    #[serde(alias = "인용_및_철학")]
    Philosophy,
    #[serde(alias = "작품_소개")]
    WorkShowcase,
    #[serde(alias = "감성_인터뷰")]
    Interview,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::DailyLife,
        ContentType::Artistic,
        ContentType::Philosophy,
        ContentType::WorkShowcase,
        ContentType::Interview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::DailyLife => "daily-life",
            ContentType::Artistic => "artistic",
            ContentType::Philosophy => "philosophy",
            ContentType::WorkShowcase => "work-showcase",
            ContentType::Interview => "interview",
        }
    }

    /// Korean theme label shown to editors.
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::DailyLife => "감성적_일상_나눔",
            ContentType::Artistic => "예술적_취향_나눔",
            ContentType::Philosophy => "인용_및_철학",
            ContentType::WorkShowcase => "작품_소개",
            ContentType::Interview => "감성_인터뷰",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ContentType::ALL
            .into_iter()
            .find(|ct| {
                ct.as_str().eq_ignore_ascii_case(trimmed)
                    || ct.as_str().replace('-', "_").eq_ignore_ascii_case(trimmed)
                    || ct.label() == trimmed
            })
            .ok_or_else(|| format!("Invalid content type: {}", s))
    }
}

/// Technical form of a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "media_kind", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Text,
    Carousel,
    Story,
}

impl MediaKind {
    /// Classifies an upload by its declared MIME type prefix.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Text => "text",
            MediaKind::Carousel => "carousel",
            MediaKind::Story => "story",
        }
    }
}

/// Social publish dispatch state of a content row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "publish_state", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    Idle,
    Queued,
    Publishing,
    Done,
}

/// Persisted content item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Content {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_type: ContentType,
    pub media_type: MediaKind,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub github_path: String,
    pub is_uploaded: bool,
    /// Platform name to [`PlatformStatus`]
    #[schema(value_type = Object)]
    pub upload_status: JsonValue,
    pub publish_state: PublishState,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Fields written when the pipeline persists a new content row
#[derive(Debug, Clone)]
pub struct NewContent {
    pub user_id: Uuid,
    pub content_type: ContentType,
    pub media_type: MediaKind,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub github_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlatformOutcome {
    Success,
    Failed,
}

/// Outcome of publishing one content item to one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlatformStatus {
    pub status: PlatformOutcome,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PlatformStatus {
    pub fn success(attempts: u32, url: Option<String>) -> Self {
        Self {
            status: PlatformOutcome::Success,
            attempts,
            error: None,
            url,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(attempts: u32, error: impl Into<String>) -> Self {
        Self {
            status: PlatformOutcome::Failed,
            attempts,
            error: Some(error.into()),
            url: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PlatformOutcome::Success
    }
}

/// Query parameters for listing content
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ContentListQuery {
    pub content_type: Option<ContentType>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
