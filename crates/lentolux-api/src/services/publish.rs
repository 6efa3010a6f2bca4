//! Background publish jobs run against the application state

use std::sync::Arc;

use async_trait::async_trait;
use lentolux_services::PublishError;
use lentolux_worker::{JobError, PublishHandlerContext, PublishJob};
use serde_json::{json, Value};

use crate::state::AppState;

/// Classify a publish failure for the queue's retry policy
pub fn job_error(err: PublishError) -> JobError {
    if err.is_recoverable() {
        JobError::recoverable(err)
    } else {
        JobError::unrecoverable(err)
    }
}

#[async_trait]
impl PublishHandlerContext for AppState {
    async fn handle_publish(self: Arc<Self>, job: &PublishJob) -> anyhow::Result<Value> {
        let report = self
            .social
            .publisher
            .publish(job.content_id)
            .await
            .map_err(job_error)?;

        Ok(json!({
            "content_id": job.content_id,
            "is_uploaded": report.content.is_uploaded,
            "platforms": report.statuses,
        }))
    }

    async fn job_abandoned(self: Arc<Self>, job: &PublishJob) {
        if let Err(e) = self.db.contents.release_claim(job.content_id).await {
            tracing::error!(
                error = %e,
                content_id = %job.content_id,
                "Failed to release publish claim"
            );
        }
    }
}
