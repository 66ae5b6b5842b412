//! Application state shared by all handlers.

use scanvault_core::Config;
use scanvault_services::ScanLifecycleController;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub scans: ScanLifecycleController,
}
