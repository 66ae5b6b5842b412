//! Scan lifecycle and vendor gateway services.

pub mod lifecycle;
pub mod virustotal;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use lifecycle::{LifecycleSettings, Reconciliation, ScanLifecycleController};
pub use virustotal::{GatewayError, ScanGateway, VirusTotalGateway};
