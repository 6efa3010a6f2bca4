//! Lento&Lux Archive Library
//!
//! Archive store abstraction and backends. Watermarked artifacts are archived
//! under a fixed per-content-type directory below `contents/`:
//!
//! - `contents/{directory}/{basename}`
//!
//! Remote paths must not contain `..` or a leading `/`. Path generation lives
//! in the `keys` module so every backend uses the same layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "archive-github")]
pub mod github;
#[cfg(feature = "archive-local")]
pub mod local;
pub mod retry;
pub mod traits;

// Re-export commonly used types
pub use factory::create_archive;
#[cfg(feature = "archive-github")]
pub use github::{GitHubArchive, GitHubArchiveConfig};
pub use lentolux_core::ArchiveBackend;
#[cfg(feature = "archive-local")]
pub use local::LocalArchive;
pub use retry::RetryPolicy;
pub use traits::{ArchiveError, ArchiveResult, ArchiveStore};
