use lentolux_core::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while publishing one content item
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("content {0} not found")]
    NotFound(Uuid),

    #[error("no social platforms configured")]
    NoPlatforms,

    #[error("content {0} kept changing while recording publish results")]
    VersionConflict(Uuid),

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl PublishError {
    /// Whether running the same publish again could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PublishError::VersionConflict(_) | PublishError::Storage(_))
    }
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::NotFound(id) => AppError::NotFound(format!("Content {} not found", id)),
            PublishError::NoPlatforms => {
                AppError::BadRequest("No social platforms configured".to_string())
            }
            PublishError::VersionConflict(id) => {
                AppError::Conflict(format!("Content {} was modified concurrently", id))
            }
            PublishError::Storage(e) => e,
        }
    }
}
