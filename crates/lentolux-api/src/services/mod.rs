//! Request-level orchestration on top of the domain crates

pub mod pipeline;
pub mod publish;

pub use pipeline::{ContentPipeline, UploadRequest};
