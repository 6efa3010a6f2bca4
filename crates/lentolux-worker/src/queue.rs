//! Publish queue: bounded channel feeding a semaphore-limited worker pool.
//!
//! Shutdown: [`PublishQueue::shutdown`] stops intake, abandons jobs still in
//! the channel (so their claims are released), then waits up to
//! `shutdown_grace` for in-flight jobs.

use anyhow::{anyhow, Result};
use serde_json::json;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::context::PublishHandlerContext;
use crate::job::{is_recoverable, JobStatus, PublishJob};

/// Upper bound on the delay between retries of one job
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(300);

/// Delay before retry number `retry_count + 1` (exponential with cap).
#[inline]
pub fn compute_retry_backoff(retry_count: u32, base: Duration) -> Duration {
    let factor = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(factor).min(MAX_RETRY_BACKOFF)
}

/// Receives `(content_id, status)` whenever a job reaches a final state.
pub type JobFinishedSender = mpsc::Sender<(Uuid, JobStatus)>;

#[derive(Clone, Debug)]
pub struct PublishQueueConfig {
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub job_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub shutdown_grace: Duration,
}

impl Default for PublishQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_capacity: 64,
            job_timeout: Duration::from_secs(300),
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

pub struct PublishQueue {
    job_tx: mpsc::Sender<PublishJob>,
    config: PublishQueueConfig,
    shutdown_tx: mpsc::Sender<()>,
    pool_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PublishQueue {
    /// Create the queue and spawn its worker pool. Must be called inside a Tokio runtime.
    pub fn new(
        config: PublishQueueConfig,
        context: Weak<dyn PublishHandlerContext>,
        finished_tx: Option<JobFinishedSender>,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let config_clone = config.clone();
        let handle = tokio::spawn(async move {
            Self::worker_pool(config_clone, context, job_rx, shutdown_rx, finished_tx).await;
        });

        Self {
            job_tx,
            config,
            shutdown_tx,
            pool_handle: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Queue without a worker. Every submission fails; for state that never publishes.
    pub fn new_no_worker(config: PublishQueueConfig) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.queue_capacity.max(1));
        drop(job_rx);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        drop(shutdown_rx);
        Self {
            job_tx,
            config,
            shutdown_tx,
            pool_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &PublishQueueConfig {
        &self.config
    }

    /// Hand a job to the pool without waiting. Fails when the queue is full or stopped.
    #[tracing::instrument(skip(self, job), fields(content_id = %job.content_id))]
    pub fn submit(&self, job: PublishJob) -> Result<()> {
        match self.job_tx.try_send(job) {
            Ok(()) => {
                tracing::info!("Publish job queued");
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                tracing::warn!(content_id = %job.content_id, "Publish queue is full");
                Err(anyhow!("publish queue is full"))
            }
            Err(TrySendError::Closed(_)) => Err(anyhow!("publish queue is not running")),
        }
    }

    async fn worker_pool(
        config: PublishQueueConfig,
        context: Weak<dyn PublishHandlerContext>,
        mut job_rx: mpsc::Receiver<PublishJob>,
        mut shutdown_rx: mpsc::Receiver<()>,
        finished_tx: Option<JobFinishedSender>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            job_timeout_secs = config.job_timeout.as_secs(),
            "Publish worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Publish worker pool shutting down");
                    job_rx.close();
                    Self::abandon_pending(&mut job_rx, &context, finished_tx.as_ref()).await;
                    break;
                }
                job = job_rx.recv() => {
                    let Some(job) = job else { break };
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let ctx = context.clone();
                    let cfg = config.clone();
                    let finished = finished_tx.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        let content_id = job.content_id;
                        let status = Self::process_job_with_retry(job, ctx, cfg).await;
                        if let Some(tx) = finished {
                            let _ = tx.send((content_id, status)).await;
                        }
                    });
                }
            }
        }

        // Every permit back means every in-flight job finished
        let in_flight = config.max_workers.max(1) as u32;
        match tokio::time::timeout(config.shutdown_grace, semaphore.acquire_many(in_flight)).await {
            Ok(_) => tracing::info!("Publish worker pool stopped"),
            Err(_) => tracing::warn!(
                grace_secs = config.shutdown_grace.as_secs(),
                "Publish jobs still running after shutdown grace period"
            ),
        };
    }

    /// Release the claim of every job still waiting in the channel
    async fn abandon_pending(
        job_rx: &mut mpsc::Receiver<PublishJob>,
        context: &Weak<dyn PublishHandlerContext>,
        finished_tx: Option<&JobFinishedSender>,
    ) {
        let mut abandoned = 0usize;
        while let Some(job) = job_rx.recv().await {
            if let Some(ctx) = context.upgrade() {
                ctx.job_abandoned(&job).await;
            }
            if let Some(tx) = finished_tx {
                let _ = tx.send((job.content_id, JobStatus::Cancelled)).await;
            }
            abandoned += 1;
        }
        if abandoned > 0 {
            tracing::warn!(abandoned = abandoned, "Queued publish jobs abandoned at shutdown");
        }
    }

    #[tracing::instrument(skip(context, config), fields(content_id = %job.content_id))]
    async fn process_job_with_retry(
        job: PublishJob,
        context: Weak<dyn PublishHandlerContext>,
        config: PublishQueueConfig,
    ) -> JobStatus {
        let mut retry_count = 0;
        loop {
            let Some(ctx) = context.upgrade() else {
                tracing::error!("Publish handler context was dropped, cannot process job");
                return JobStatus::Failed;
            };

            let result =
                tokio::time::timeout(config.job_timeout, ctx.clone().handle_publish(&job)).await;

            match result {
                Ok(Ok(summary)) => {
                    tracing::info!(summary = %summary, "Publish job completed");
                    return JobStatus::Completed;
                }
                Ok(Err(e)) => {
                    let recoverable = is_recoverable(&e);
                    tracing::error!(
                        error = %e,
                        retry_count = retry_count,
                        max_retries = config.max_retries,
                        recoverable = recoverable,
                        "Publish job failed"
                    );
                    if !recoverable || retry_count >= config.max_retries {
                        ctx.job_abandoned(&job).await;
                        return JobStatus::Failed;
                    }
                    let backoff = compute_retry_backoff(retry_count, config.retry_base_delay);
                    tracing::info!(
                        retry_count = retry_count + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "Scheduling publish retry"
                    );
                    drop(ctx);
                    tokio::time::sleep(backoff).await;
                    retry_count += 1;
                }
                Err(_) => {
                    let detail = json!({
                        "error": "Publish job timed out",
                        "timeout_seconds": config.job_timeout.as_secs(),
                    });
                    tracing::error!(detail = %detail, "Publish job timed out");
                    ctx.job_abandoned(&job).await;
                    return JobStatus::TimedOut;
                }
            }
        }
    }

    /// Stop the pool and wait until queued jobs are abandoned and in-flight
    /// jobs finish or the grace period runs out.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating publish queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
        let handle = self.pool_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Publish worker pool task failed");
            }
        }
    }
}

impl Clone for PublishQueue {
    fn clone(&self) -> Self {
        Self {
            job_tx: self.job_tx.clone(),
            config: self.config.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
            pool_handle: self.pool_handle.clone(),
        }
    }
}
