//! In-process publish queue
//!
//! Jobs are handed to a bounded worker pool. Each job runs with a timeout and
//! reports its final status on an optional channel.

pub mod context;
pub mod job;
pub mod queue;

pub use context::{empty_context_weak, PublishHandlerContext};
pub use job::{JobError, JobStatus, PublishJob};
pub use queue::{compute_retry_backoff, JobFinishedSender, PublishQueue, PublishQueueConfig};
