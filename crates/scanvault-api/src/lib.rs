//! ScanVault API Library
//!
//! This crate provides the HTTP API handlers, middleware, and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use telemetry::init_telemetry;
