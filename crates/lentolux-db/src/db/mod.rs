//! Database repositories for data access layer
//!
//! Each repository wraps a `PgPool`, is cheap to clone, and is the only code
//! that mutates its table.

pub mod content;
pub mod user;

pub use content::ContentRepository;
pub use user::UserRepository;
