//! Job handler context trait
//!
//! The API implements this trait for its application state. The queue holds a
//! weak reference so the state can own the queue without a reference cycle.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Weak};

use crate::job::PublishJob;

#[async_trait]
pub trait PublishHandlerContext: Send + Sync {
    /// Run one publish job and return a JSON summary of the outcome.
    async fn handle_publish(self: Arc<Self>, job: &PublishJob) -> Result<serde_json::Value>;

    /// Called once when the queue gives up on a job, so any claim it held can be released.
    async fn job_abandoned(self: Arc<Self>, _job: &PublishJob) {}
}

struct NoopContext;

#[async_trait]
impl PublishHandlerContext for NoopContext {
    async fn handle_publish(self: Arc<Self>, _job: &PublishJob) -> Result<serde_json::Value> {
        Err(anyhow!("NoopContext: no handler context available"))
    }
}

/// Weak reference to a context that is already gone. Jobs dispatched against it fail.
pub fn empty_context_weak() -> Weak<dyn PublishHandlerContext> {
    let n: Arc<dyn PublishHandlerContext> = Arc::new(NoopContext);
    Arc::downgrade(&n)
}
