//! Lento&Lux service layer
//!
//! Pushes archived content to the configured social platforms and records the
//! per-platform outcome on the content row.

pub mod error;
pub mod social;

pub use error::PublishError;
pub use social::{
    publish_to_platforms, HttpSocialPlatform, PlatformError, PublishReport, PublishStatusStore,
    SocialPlatform, SocialPost, SocialPublisher, SocialPublisherConfig,
};
