//! Postgres persistence for ScanVault.

pub mod db;

pub use db::{run_migrations, ScanRepository, UserRepository};
