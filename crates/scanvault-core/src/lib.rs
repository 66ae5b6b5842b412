//! ScanVault Core Library
//!
//! This crate provides core domain models, error types, configuration, and the
//! persistence seams that are shared across all ScanVault components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ScanServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use store::{ScanStore, UserDirectory};
