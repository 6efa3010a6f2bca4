//! Lento&Lux Core Library
//!
//! Domain models, error types and configuration shared by every crate in the
//! content pipeline.

pub mod archive_types;
pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use archive_types::ArchiveBackend;
pub use config::{AdminBootstrapConfig, BaseConfig, Config, PipelineConfig, SocialPlatformConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
