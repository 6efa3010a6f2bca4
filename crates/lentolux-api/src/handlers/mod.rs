pub mod auth;
pub mod content;
pub mod health;
pub mod social;
