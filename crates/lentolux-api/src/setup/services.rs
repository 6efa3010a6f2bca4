//! Service and repository initialization

use anyhow::{Context, Result};
use lentolux_core::models::{NewUser, UserRole};
use lentolux_core::Config;
use lentolux_db::{ContentRepository, UserRepository};
use lentolux_processing::{MediaProcessor, MediaProcessorConfig};
use lentolux_services::SocialPublisher;
use lentolux_storage::create_archive;
use lentolux_worker::{JobStatus, PublishQueueConfig};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::state::{AppState, StateParts};

const JOB_FINISHED_CHANNEL_CAPACITY: usize = 256;

pub fn publish_queue_config(config: &Config) -> PublishQueueConfig {
    PublishQueueConfig {
        max_workers: config.publish_max_workers(),
        job_timeout: Duration::from_secs(config.publish_timeout_secs()),
        ..PublishQueueConfig::default()
    }
}

/// Initialize all services and repositories
pub async fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let processor = MediaProcessor::new(MediaProcessorConfig::from_config(config));

    let archive = create_archive(config)
        .await
        .context("Failed to initialize archive store")?;
    tracing::info!(backend = %archive.backend_type(), "Archive store initialized");

    let publisher = SocialPublisher::from_config(config, ContentRepository::new(pool.clone()))
        .context("Failed to initialize social platforms")?;
    let platforms = publisher.platform_names().join(",");
    if platforms.is_empty() {
        tracing::warn!("No social platforms configured; publish requests will be rejected");
    } else {
        tracing::info!(platforms = %platforms, "Social publisher initialized");
    }

    // Claims held by jobs of a previous process can never complete
    let released = ContentRepository::new(pool.clone())
        .release_stale_claims()
        .await
        .context("Failed to release stale publish claims")?;
    if released > 0 {
        tracing::warn!(released = released, "Released stale publish claims");
    }

    let (finished_tx, finished_rx) = mpsc::channel(JOB_FINISHED_CHANNEL_CAPACITY);
    tokio::spawn(log_finished_jobs(finished_rx));

    let state = AppState::assemble(
        StateParts {
            config: config.clone(),
            pool,
            processor,
            archive,
            publisher,
            queue_config: publish_queue_config(config),
        },
        Some(finished_tx),
    );

    bootstrap_admin(config, &state.db.users).await?;

    Ok(state)
}

async fn log_finished_jobs(mut finished_rx: mpsc::Receiver<(Uuid, JobStatus)>) {
    while let Some((content_id, status)) = finished_rx.recv().await {
        match status {
            JobStatus::Completed => {
                tracing::info!(content_id = %content_id, "Publish job completed")
            }
            JobStatus::Failed | JobStatus::TimedOut | JobStatus::Cancelled => {
                tracing::warn!(content_id = %content_id, status = ?status, "Publish job did not complete")
            }
        }
    }
}

/// Create the configured admin account unless its email or username is taken
async fn bootstrap_admin(config: &Config, users: &UserRepository) -> Result<()> {
    let Some(admin) = config.admin() else {
        return Ok(());
    };

    let created = users
        .create_if_absent(NewUser {
            email: admin.email.trim().to_lowercase(),
            username: admin.username.clone(),
            hashed_password: hash_password(&admin.password)?,
            role: UserRole::Admin,
        })
        .await
        .context("Failed to bootstrap admin account")?;

    match created {
        Some(user) => tracing::info!(user_id = %user.id, "Bootstrap admin account created"),
        None => tracing::debug!("Bootstrap admin account already exists"),
    }
    Ok(())
}
