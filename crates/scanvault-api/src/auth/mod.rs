//! Session authentication: bearer JWT verification and the `SessionUser` extractor.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::JwtValidator;
pub use middleware::{auth_middleware, AuthState};
pub use models::{SessionClaims, SessionUser};
