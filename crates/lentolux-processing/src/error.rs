use lentolux_core::AppError;
use thiserror::Error;

/// Media processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode media: {0}")]
    Decode(String),

    #[error("Failed to encode media: {0}")]
    Encode(String),

    #[error("Watermark font unavailable: {0}")]
    FontUnavailable(String),

    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),

    #[error("Processing timed out after {0} seconds")]
    Timeout(u64),

    #[error("Processing task failed: {0}")]
    Task(String),
}

/// Result type for processing operations
pub type ProcessingResult<T> = Result<T, ProcessingError>;

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Decode(_) | ProcessingError::Ffmpeg(_) | ProcessingError::Timeout(_) => {
                AppError::MediaProcessing(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lentolux_core::ErrorMetadata;

    #[test]
    fn test_decode_errors_map_to_media_processing() {
        let err: AppError = ProcessingError::Decode("empty file".into()).into();
        assert_eq!(err.error_code(), "MEDIA_PROCESSING_ERROR");

        let err: AppError = ProcessingError::FontUnavailable("none".into()).into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
