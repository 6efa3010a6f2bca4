use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Request to publish one content item to the social platforms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishJob {
    pub content_id: Uuid,
    pub requested_by: Uuid,
    pub submitted_at: DateTime<Utc>,
}

impl PublishJob {
    pub fn new(content_id: Uuid, requested_by: Uuid) -> Self {
        Self {
            content_id,
            requested_by,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
    TimedOut,
    /// Still queued when the pool shut down
    Cancelled,
}

/// Handler error carrying whether the job is worth retrying
#[derive(Debug, Error)]
#[error("{inner}")]
pub struct JobError {
    recoverable: bool,
    inner: anyhow::Error,
}

impl JobError {
    pub fn recoverable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            recoverable: true,
            inner: err.into(),
        }
    }

    pub fn unrecoverable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            recoverable: false,
            inner: err.into(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

/// Errors that are not a [`JobError`] count as unrecoverable
pub(crate) fn is_recoverable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<JobError>()
        .map(JobError::is_recoverable)
        .unwrap_or(false)
}
