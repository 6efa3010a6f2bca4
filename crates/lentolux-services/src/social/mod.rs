//! Social platform publishing

pub mod http;
pub mod platform;
pub mod publisher;

pub use http::HttpSocialPlatform;
pub use platform::{PlatformError, SocialPlatform, SocialPost};
pub use publisher::{
    publish_to_platforms, PublishReport, PublishStatusStore, SocialPublisher,
    SocialPublisherConfig,
};
