//! Lento&Lux API Library
//!
//! HTTP handlers, authentication, the upload pipeline and application setup.

mod api_doc;
mod handlers;
pub mod services;
pub mod setup;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use lentolux_worker::{PublishQueue, PublishQueueConfig};
pub use services::pipeline::ContentPipeline;
