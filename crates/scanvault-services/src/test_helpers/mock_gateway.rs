use async_trait::async_trait;
use bytes::Bytes;
use scanvault_core::models::AnalysisReport;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::analysis_report;
use crate::virustotal::{GatewayError, ScanGateway};

/// Scriptable gateway that counts its calls.
#[derive(Clone)]
pub struct MockScanGateway {
    vendor_status: Arc<Mutex<String>>,
    fail_submissions: Arc<AtomicBool>,
    fail_lookups: Arc<AtomicBool>,
    lookup_delay: Arc<Mutex<Option<Duration>>>,
    submit_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

impl Default for MockScanGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScanGateway {
    /// Accepts submissions and reports every analysis as `queued`.
    pub fn new() -> Self {
        Self {
            vendor_status: Arc::new(Mutex::new("queued".to_string())),
            fail_submissions: Arc::new(AtomicBool::new(false)),
            fail_lookups: Arc::new(AtomicBool::new(false)),
            lookup_delay: Arc::new(Mutex::new(None)),
            submit_calls: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_vendor_status(&self, status: &str) {
        *self.vendor_status.lock().unwrap() = status.to_string();
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Hold every lookup for `delay` so concurrent callers overlap.
    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock().unwrap() = Some(delay);
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScanGateway for MockScanGateway {
    async fn submit_file(&self, _file_name: &str, _data: Bytes) -> Result<String, GatewayError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(GatewayError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(format!("analysis-{}", call))
    }

    async fn fetch_analysis(
        &self,
        external_reference_id: &str,
    ) -> Result<AnalysisReport, GatewayError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(GatewayError::MalformedResponse(
                "analysis response has no data".to_string(),
            ));
        }
        let status = self.vendor_status.lock().unwrap().clone();
        Ok(analysis_report(external_reference_id, &status))
    }
}
