//! Authentication: password hashing, HS256 access tokens and the bearer middleware.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use jwt::JwtService;
pub use middleware::{auth_middleware, AuthState};
pub use models::{AuthUser, JwtClaims};
