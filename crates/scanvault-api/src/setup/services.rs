//! Service and repository wiring

use crate::state::AppState;
use anyhow::{Context, Result};
use scanvault_core::Config;
use scanvault_db::{ScanRepository, UserRepository};
use scanvault_services::{LifecycleSettings, ScanLifecycleController, VirusTotalGateway};
use sqlx::PgPool;
use std::sync::Arc;

/// Build repositories, the VirusTotal gateway and the lifecycle controller.
pub fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let scan_repository = ScanRepository::new(pool.clone());
    let user_repository = UserRepository::new(pool.clone());

    let gateway = VirusTotalGateway::from_config(config)
        .context("Failed to initialize VirusTotal gateway")?;
    tracing::info!(
        base_url = %config.virustotal_api_url(),
        timeout_secs = config.virustotal_timeout_secs(),
        "VirusTotal gateway initialized"
    );

    let scans = ScanLifecycleController::new(
        Arc::new(scan_repository),
        Arc::new(user_repository),
        Arc::new(gateway),
        LifecycleSettings::from_config(config),
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        pool,
        scans,
    }))
}
