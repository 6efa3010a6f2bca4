//! Lento&Lux media processing
//!
//! Persists raw uploads and burns the "Lento&Lux Inc." watermark into images
//! (raster text overlay) and videos (ffmpeg drawtext).

pub mod error;
pub mod fonts;
#[cfg(feature = "image")]
pub mod image;
pub mod processor;
#[cfg(feature = "video")]
pub mod video;

pub use error::{ProcessingError, ProcessingResult};
pub use processor::{MediaProcessor, MediaProcessorConfig, ProcessedMedia};

/// Text burned into every image and video
pub const WATERMARK_TEXT: &str = "Lento&Lux Inc.";
