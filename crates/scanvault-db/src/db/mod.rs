//! Database repositories for the data access layer
//!
//! `ScanRepository` and `UserRepository` implement the storage traits from
//! `scanvault-core` on top of a shared `PgPool`.

pub mod migrate;
pub mod scan;
pub mod user;

pub use migrate::run_migrations;
pub use scan::ScanRepository;
pub use user::UserRepository;
