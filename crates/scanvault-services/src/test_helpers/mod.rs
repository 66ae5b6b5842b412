//! Test helpers for lifecycle and API tests
//!
//! In-memory implementations of the store, user directory and gateway so the
//! controller and router can be exercised without Postgres or VirusTotal.

pub mod mock_gateway;
pub mod mock_repositories;

pub use mock_gateway::MockScanGateway;
pub use mock_repositories::{MockScanStore, MockUserDirectory};

use scanvault_core::models::{AnalysisReport, DetectionStats};
use std::sync::Arc;

use crate::lifecycle::{LifecycleSettings, ScanLifecycleController};

/// Controller wired to fresh mocks, returned together with the mocks.
pub fn mock_controller() -> (
    ScanLifecycleController,
    Arc<MockScanStore>,
    Arc<MockUserDirectory>,
    Arc<MockScanGateway>,
) {
    let scans = Arc::new(MockScanStore::new());
    let users = Arc::new(MockUserDirectory::new());
    let gateway = Arc::new(MockScanGateway::new());
    let controller = ScanLifecycleController::new(
        scans.clone(),
        users.clone(),
        gateway.clone(),
        LifecycleSettings::default(),
    );
    (controller, scans, users, gateway)
}

/// Vendor report with the given status and a small clean verdict.
pub fn analysis_report(analysis_id: &str, vendor_status: &str) -> AnalysisReport {
    AnalysisReport {
        analysis_id: analysis_id.to_string(),
        vendor_status: vendor_status.to_string(),
        stats: Some(DetectionStats {
            undetected: 60,
            harmless: 5,
            ..DetectionStats::default()
        }),
        results: None,
    }
}
