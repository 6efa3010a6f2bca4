//! Data models for the application
//!
//! Identity, content metadata and the fixed weekly publishing schedule.

mod content;
mod schedule;
mod user;

pub use content::*;
pub use schedule::*;
pub use user::*;
