pub mod db;

pub use db::{ContentRepository, UserRepository};
