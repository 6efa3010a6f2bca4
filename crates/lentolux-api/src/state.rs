//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only what
//! they need via Axum's `FromRef`.

use std::sync::{Arc, Weak};

use lentolux_core::Config;
use lentolux_db::{ContentRepository, UserRepository};
use lentolux_processing::MediaProcessor;
use lentolux_services::SocialPublisher;
use lentolux_storage::ArchiveStore;
use lentolux_worker::{JobFinishedSender, PublishHandlerContext, PublishQueue, PublishQueueConfig};
use sqlx::PgPool;

use crate::auth::JwtService;
use crate::services::ContentPipeline;

/// Database pool and repositories
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub users: UserRepository,
    pub contents: ContentRepository,
}

/// Upload pipeline and its limits
#[derive(Clone)]
pub struct MediaState {
    pub pipeline: ContentPipeline,
    pub max_upload_size: usize,
}

/// Social publisher and the queue that runs it in the background
#[derive(Clone)]
pub struct SocialState {
    pub publisher: Arc<SocialPublisher>,
    pub queue: PublishQueue,
}

/// Everything needed to assemble [`AppState`]
pub struct StateParts {
    pub config: Config,
    pub pool: PgPool,
    pub processor: MediaProcessor,
    pub archive: Arc<dyn ArchiveStore>,
    pub publisher: SocialPublisher,
    pub queue_config: PublishQueueConfig,
}

/// Main application state: aggregates sub-states for dependency injection.
pub struct AppState {
    pub db: DbState,
    pub media: MediaState,
    pub social: SocialState,
    pub jwt: JwtService,
    pub config: Config,
}

impl AppState {
    /// Build the state and start the publish queue.
    ///
    /// The queue only holds a weak reference back to the state, so dropping the
    /// last `Arc<AppState>` stops jobs from being handled. Must be called inside
    /// a Tokio runtime.
    pub fn assemble(parts: StateParts, finished_tx: Option<JobFinishedSender>) -> Arc<Self> {
        let StateParts {
            config,
            pool,
            processor,
            archive,
            publisher,
            queue_config,
        } = parts;

        Arc::new_cyclic(|weak: &Weak<AppState>| {
            let context: Weak<dyn PublishHandlerContext> = weak.clone();
            let queue = PublishQueue::new(queue_config, context, finished_tx);

            let users = UserRepository::new(pool.clone());
            let contents = ContentRepository::new(pool.clone());

            AppState {
                media: MediaState {
                    pipeline: ContentPipeline::new(Arc::new(processor), archive, contents.clone()),
                    max_upload_size: config.max_upload_size_bytes(),
                },
                db: DbState {
                    pool,
                    users,
                    contents,
                },
                social: SocialState {
                    publisher: Arc::new(publisher),
                    queue,
                },
                jwt: JwtService::from_config(&config),
                config,
            }
        })
    }
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for MediaState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.media.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for SocialState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.social.clone()
    }
}
