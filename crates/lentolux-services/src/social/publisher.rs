//! Fan-out of one content item to every configured platform.
//!
//! Platforms are attempted concurrently and independently. The outcome map is
//! merged into `upload_status` with an optimistic version check, so concurrent
//! writers to the same row never overwrite each other.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use lentolux_core::models::{Content, PlatformStatus};
use lentolux_core::{AppError, Config};
use lentolux_db::ContentRepository;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::http::HttpSocialPlatform;
use super::platform::{PlatformError, SocialPlatform, SocialPost};
use crate::error::PublishError;

const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 8_000;
/// Re-reads allowed when the row version moves under us
const MAX_RECORD_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct SocialPublisherConfig {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
}

impl SocialPublisherConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.social_max_attempts().max(1),
            attempt_timeout: Duration::from_secs(config.social_timeout_secs()),
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let ms = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(ms.min(MAX_BACKOFF_MS))
    }
}

/// Persistence the publisher needs from the content table
#[async_trait]
pub trait PublishStatusStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<Content>, AppError>;

    async fn mark_publishing(&self, id: Uuid) -> Result<bool, AppError>;

    /// Merge `statuses` into the row if it is still at `expected_version`.
    /// `None` means the version moved.
    async fn record(
        &self,
        id: Uuid,
        expected_version: i32,
        statuses: &JsonValue,
        any_success: bool,
    ) -> Result<Option<Content>, AppError>;
}

#[async_trait]
impl PublishStatusStore for ContentRepository {
    async fn load(&self, id: Uuid) -> Result<Option<Content>, AppError> {
        self.get(id).await
    }

    async fn mark_publishing(&self, id: Uuid) -> Result<bool, AppError> {
        ContentRepository::mark_publishing(self, id).await
    }

    async fn record(
        &self,
        id: Uuid,
        expected_version: i32,
        statuses: &JsonValue,
        any_success: bool,
    ) -> Result<Option<Content>, AppError> {
        self.record_publish_result(id, expected_version, statuses, any_success)
            .await
    }
}

/// Outcome of one publish run
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub content: Content,
    pub statuses: BTreeMap<String, PlatformStatus>,
}

impl PublishReport {
    pub fn any_success(&self) -> bool {
        self.statuses.values().any(PlatformStatus::is_success)
    }
}

async fn publish_with_retry(
    platform: &dyn SocialPlatform,
    post: &SocialPost,
    config: &SocialPublisherConfig,
) -> PlatformStatus {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(config.attempt_timeout, platform.publish(post)).await
        {
            Ok(result) => result,
            Err(_) => Err(PlatformError::Timeout(config.attempt_timeout.as_secs())),
        };

        match result {
            Ok(url) => return PlatformStatus::success(attempt, url),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = config.backoff(attempt);
                tracing::warn!(
                    platform = platform.name(),
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Platform publish failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(
                    platform = platform.name(),
                    attempts = attempt,
                    error = %err,
                    "Platform publish failed"
                );
                return PlatformStatus::failed(attempt, err.to_string());
            }
        }
    }
}

/// Push `post` to every platform concurrently. A failure on one platform never
/// affects the others.
pub async fn publish_to_platforms(
    platforms: &[Arc<dyn SocialPlatform>],
    post: &SocialPost,
    config: &SocialPublisherConfig,
) -> BTreeMap<String, PlatformStatus> {
    let runs = platforms.iter().map(|platform| async move {
        let status = publish_with_retry(platform.as_ref(), post, config).await;
        (platform.name().to_string(), status)
    });
    join_all(runs).await.into_iter().collect()
}

pub struct SocialPublisher {
    store: Arc<dyn PublishStatusStore>,
    platforms: Vec<Arc<dyn SocialPlatform>>,
    config: SocialPublisherConfig,
}

impl SocialPublisher {
    pub fn new(
        store: Arc<dyn PublishStatusStore>,
        platforms: Vec<Arc<dyn SocialPlatform>>,
        config: SocialPublisherConfig,
    ) -> Self {
        Self {
            store,
            platforms,
            config,
        }
    }

    pub fn from_config(
        config: &Config,
        repository: ContentRepository,
    ) -> Result<Self, PlatformError> {
        let platforms = HttpSocialPlatform::from_config(config)?
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn SocialPlatform>)
            .collect();
        Ok(Self::new(
            Arc::new(repository),
            platforms,
            SocialPublisherConfig::from_config(config),
        ))
    }

    pub fn platform_names(&self) -> Vec<&str> {
        self.platforms.iter().map(|p| p.name()).collect()
    }

    /// Publish a claimed content row and record the outcome.
    ///
    /// Recording settles the claim (done on any success, idle otherwise). When
    /// an error is returned the claim is left in place for the caller to
    /// release once it stops retrying.
    #[tracing::instrument(skip(self), fields(platforms = self.platforms.len()))]
    pub async fn publish(&self, content_id: Uuid) -> Result<PublishReport, PublishError> {
        let start = Instant::now();
        if self.platforms.is_empty() {
            return Err(PublishError::NoPlatforms);
        }

        if !self.store.mark_publishing(content_id).await? {
            tracing::debug!(content_id = %content_id, "Publish state was not queued");
        }

        let content = self
            .store
            .load(content_id)
            .await?
            .ok_or(PublishError::NotFound(content_id))?;

        let post = SocialPost::from_content(&content);
        let statuses = publish_to_platforms(&self.platforms, &post, &self.config).await;
        let content = self.record(content, &statuses).await?;

        let report = PublishReport { content, statuses };
        tracing::info!(
            content_id = %content_id,
            succeeded = report.statuses.values().filter(|s| s.is_success()).count(),
            failed = report.statuses.values().filter(|s| !s.is_success()).count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Publish finished"
        );
        Ok(report)
    }

    async fn record(
        &self,
        mut content: Content,
        statuses: &BTreeMap<String, PlatformStatus>,
    ) -> Result<Content, PublishError> {
        let payload = serde_json::to_value(statuses).map_err(AppError::from)?;
        let any_success = statuses.values().any(PlatformStatus::is_success);

        for attempt in 1..=MAX_RECORD_ATTEMPTS {
            if let Some(updated) = self
                .store
                .record(content.id, content.version, &payload, any_success)
                .await?
            {
                return Ok(updated);
            }

            tracing::debug!(
                content_id = %content.id,
                attempt = attempt,
                "Content version moved, reloading before recording"
            );
            content = self
                .store
                .load(content.id)
                .await?
                .ok_or(PublishError::NotFound(content.id))?;
        }

        Err(PublishError::VersionConflict(content.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lentolux_core::models::{ContentType, MediaKind, PlatformOutcome, PublishState};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn fast_config(max_attempts: u32) -> SocialPublisherConfig {
        SocialPublisherConfig {
            max_attempts,
            attempt_timeout: Duration::from_millis(200),
            base_delay: Duration::from_millis(1),
        }
    }

    fn sample_content() -> Content {
        Content {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content_type: ContentType::Philosophy,
            media_type: MediaKind::Text,
            title: "Test".to_string(),
            description: None,
            file_path: "uploads/a.txt".to_string(),
            github_path: "contents/인용_및_철학/a.txt".to_string(),
            is_uploaded: false,
            upload_status: serde_json::json!({}),
            publish_state: PublishState::Queued,
            version: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    /// Fails `failures` times, then succeeds
    struct FlakyPlatform {
        name: &'static str,
        failures: u32,
        retryable: bool,
        calls: AtomicU32,
    }

    impl FlakyPlatform {
        fn new(name: &'static str, failures: u32, retryable: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                failures,
                retryable,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl SocialPlatform for FlakyPlatform {
        fn name(&self) -> &str {
            self.name
        }

        async fn publish(&self, _post: &SocialPost) -> Result<Option<String>, PlatformError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                let status = if self.retryable { 503 } else { 400 };
                return Err(PlatformError::Rejected {
                    status,
                    message: "nope".to_string(),
                });
            }
            Ok(Some(format!("https://{}.example/p/1", self.name)))
        }
    }

    fn dyn_platforms(list: Vec<Arc<FlakyPlatform>>) -> Vec<Arc<dyn SocialPlatform>> {
        list.into_iter()
            .map(|p| p as Arc<dyn SocialPlatform>)
            .collect()
    }

    struct SlowPlatform;

    #[async_trait]
    impl SocialPlatform for SlowPlatform {
        fn name(&self) -> &str {
            "slow"
        }

        async fn publish(&self, _post: &SocialPost) -> Result<Option<String>, PlatformError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
    }

    /// In-memory row with an optional number of concurrent writes injected before recording
    struct MemoryStore {
        content: Mutex<Option<Content>>,
        interfering_writes: AtomicU32,
    }

    impl MemoryStore {
        fn new(content: Content, interfering_writes: u32) -> Arc<Self> {
            Arc::new(Self {
                content: Mutex::new(Some(content)),
                interfering_writes: AtomicU32::new(interfering_writes),
            })
        }

        fn snapshot(&self) -> Content {
            self.content.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl PublishStatusStore for MemoryStore {
        async fn load(&self, _id: Uuid) -> Result<Option<Content>, AppError> {
            Ok(self.content.lock().unwrap().clone())
        }

        async fn mark_publishing(&self, _id: Uuid) -> Result<bool, AppError> {
            let mut guard = self.content.lock().unwrap();
            let content = guard.as_mut().unwrap();
            let was_queued = content.publish_state == PublishState::Queued;
            content.publish_state = PublishState::Publishing;
            Ok(was_queued)
        }

        async fn record(
            &self,
            _id: Uuid,
            expected_version: i32,
            statuses: &JsonValue,
            any_success: bool,
        ) -> Result<Option<Content>, AppError> {
            let mut guard = self.content.lock().unwrap();
            let content = guard.as_mut().unwrap();

            if self.interfering_writes.load(Ordering::SeqCst) > 0 {
                self.interfering_writes.fetch_sub(1, Ordering::SeqCst);
                content.version += 1;
            }
            if content.version != expected_version {
                return Ok(None);
            }

            let merged = content.upload_status.as_object_mut().unwrap();
            for (k, v) in statuses.as_object().unwrap() {
                merged.insert(k.clone(), v.clone());
            }
            content.is_uploaded |= any_success;
            content.publish_state = if any_success {
                PublishState::Done
            } else {
                PublishState::Idle
            };
            content.version += 1;
            Ok(Some(content.clone()))
        }
    }

    fn post() -> SocialPost {
        SocialPost::from_content(&sample_content())
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = SocialPublisherConfig {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(1),
            base_delay: Duration::from_millis(1_000),
        };
        assert_eq!(config.backoff(1), Duration::from_millis(1_000));
        assert_eq!(config.backoff(2), Duration::from_millis(2_000));
        assert_eq!(config.backoff(6), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[tokio::test]
    async fn test_one_failing_platform_does_not_affect_others() {
        let good = FlakyPlatform::new("instagram", 0, true);
        let bad = FlakyPlatform::new("youtube", 10, false);
        let platforms: Vec<Arc<dyn SocialPlatform>> = vec![good.clone(), bad.clone()];

        let statuses = publish_to_platforms(&platforms, &post(), &fast_config(3)).await;

        assert!(statuses["instagram"].is_success());
        assert_eq!(
            statuses["instagram"].url.as_deref(),
            Some("https://instagram.example/p/1")
        );
        assert_eq!(statuses["youtube"].status, PlatformOutcome::Failed);
        // non-retryable errors are not retried
        assert_eq!(statuses["youtube"].attempts, 1);
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_retried_up_to_limit() {
        let recovers = FlakyPlatform::new("threads", 2, true);
        let gives_up = FlakyPlatform::new("tiktok", 10, true);
        let platforms: Vec<Arc<dyn SocialPlatform>> = vec![recovers.clone(), gives_up.clone()];

        let statuses = publish_to_platforms(&platforms, &post(), &fast_config(3)).await;

        assert!(statuses["threads"].is_success());
        assert_eq!(statuses["threads"].attempts, 3);
        assert!(!statuses["tiktok"].is_success());
        assert_eq!(statuses["tiktok"].attempts, 3);
        assert_eq!(gives_up.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_slow_platform_times_out() {
        let platforms: Vec<Arc<dyn SocialPlatform>> = vec![Arc::new(SlowPlatform)];
        let statuses = publish_to_platforms(&platforms, &post(), &fast_config(2)).await;

        let status = &statuses["slow"];
        assert!(!status.is_success());
        assert_eq!(status.attempts, 2);
        assert!(status.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_publish_records_statuses_and_sets_uploaded() {
        let content = sample_content();
        let store = MemoryStore::new(content.clone(), 0);
        let publisher = SocialPublisher::new(
            store.clone(),
            dyn_platforms(vec![
                FlakyPlatform::new("instagram", 0, true),
                FlakyPlatform::new("youtube", 10, false),
            ]),
            fast_config(3),
        );

        let report = publisher.publish(content.id).await.unwrap();

        assert!(report.any_success());
        let stored = store.snapshot();
        assert!(stored.is_uploaded);
        assert_eq!(stored.publish_state, PublishState::Done);
        assert_eq!(stored.upload_status["instagram"]["status"], "success");
        assert_eq!(stored.upload_status["youtube"]["status"], "failed");
    }

    #[tokio::test]
    async fn test_all_platforms_failing_leaves_content_not_uploaded() {
        let content = sample_content();
        let store = MemoryStore::new(content.clone(), 0);
        let publisher = SocialPublisher::new(
            store.clone(),
            dyn_platforms(vec![FlakyPlatform::new("instagram", 10, false)]),
            fast_config(3),
        );

        let report = publisher.publish(content.id).await.unwrap();

        assert!(!report.any_success());
        let stored = store.snapshot();
        assert!(!stored.is_uploaded);
        assert_eq!(stored.publish_state, PublishState::Idle);
        assert_eq!(stored.upload_status["instagram"]["attempts"], 1);
    }

    #[tokio::test]
    async fn test_record_retries_after_concurrent_write() {
        let content = sample_content();
        let store = MemoryStore::new(content.clone(), 2);
        let publisher = SocialPublisher::new(
            store.clone(),
            dyn_platforms(vec![FlakyPlatform::new("instagram", 0, true)]),
            fast_config(1),
        );

        let report = publisher.publish(content.id).await.unwrap();

        assert!(report.content.is_uploaded);
        // two interfering writes plus our own
        assert_eq!(store.snapshot().version, content.version + 3);
    }

    #[tokio::test]
    async fn test_record_gives_up_on_constant_contention() {
        let content = sample_content();
        let store = MemoryStore::new(content.clone(), MAX_RECORD_ATTEMPTS + 1);
        let publisher = SocialPublisher::new(
            store.clone(),
            dyn_platforms(vec![FlakyPlatform::new("instagram", 0, true)]),
            fast_config(1),
        );

        let err = publisher.publish(content.id).await.unwrap_err();

        assert!(matches!(err, PublishError::VersionConflict(_)));
        assert!(!store.snapshot().is_uploaded);
    }

    #[tokio::test]
    async fn test_no_platforms_is_an_error() {
        let content = sample_content();
        let store = MemoryStore::new(content.clone(), 0);
        let publisher = SocialPublisher::new(store.clone(), Vec::new(), fast_config(3));

        let err = publisher.publish(content.id).await.unwrap_err();

        assert!(matches!(err, PublishError::NoPlatforms));
        assert_eq!(store.snapshot().publish_state, PublishState::Queued);
        assert!(publisher.platform_names().is_empty());
    }
}
