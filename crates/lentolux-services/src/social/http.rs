use std::time::Duration;

use async_trait::async_trait;
use lentolux_core::{Config, SocialPlatformConfig};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::platform::{PlatformError, SocialPlatform, SocialPost};

const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct PublishResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Platform reached through an HTTP endpoint accepting multipart posts
#[derive(Clone)]
pub struct HttpSocialPlatform {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpSocialPlatform {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lentolux/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            name: name.into(),
            endpoint: endpoint.into(),
            token,
            timeout,
        })
    }

    /// One client per configured platform, sharing the platform token
    pub fn from_config(config: &Config) -> Result<Vec<Self>, PlatformError> {
        config
            .social_platforms()
            .iter()
            .map(|SocialPlatformConfig { name, endpoint }| {
                Self::new(
                    name.clone(),
                    endpoint.clone(),
                    config.social_platform_token().map(str::to_string),
                    Duration::from_secs(config.social_timeout_secs()),
                )
            })
            .collect()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The artifact is mandatory; a post never goes out without it.
    async fn build_form(&self, post: &SocialPost) -> Result<Form, PlatformError> {
        let data = match tokio::fs::read(&post.media_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlatformError::MissingMedia(
                    post.media_path.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let file_name = post
            .media_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "media".to_string());

        let form = Form::new()
            .text("content_id", post.content_id.to_string())
            .text("title", post.title.clone())
            .text("caption", post.caption())
            .text("content_type", post.content_type.as_str().to_string())
            .text("media_type", post.media_kind.as_str().to_string())
            .text("archive_path", post.archive_path.clone())
            .part("file", Part::bytes(data).file_name(file_name));

        Ok(form)
    }
}

#[async_trait]
impl SocialPlatform for HttpSocialPlatform {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, post), fields(platform = %self.name, content_id = %post.content_id))]
    async fn publish(&self, post: &SocialPost) -> Result<Option<String>, PlatformError> {
        let form = self.build_form(post).await?;

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PlatformError::Timeout(self.timeout.as_secs())
            } else {
                PlatformError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PlatformError::Rejected {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let url = serde_json::from_str::<PublishResponse>(&body)
            .ok()
            .and_then(|r| r.url);

        tracing::info!(platform = %self.name, url = ?url, "Post published");
        Ok(url)
    }
}
