//! Cancellable background polling of a scan's status.
//!
//! [`StatusPoller::start`] spawns a task that calls the check endpoint on a
//! fixed interval and publishes every response on a `watch` channel. The task
//! ends on its own once a terminal status is seen; [`PollHandle::cancel`] or
//! dropping the handle ends it early.

use crate::ApiClient;
use scanvault_core::constants::DEFAULT_POLL_INTERVAL_SECS;
use scanvault_core::models::ScanCheckResponse;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Poll interval from SCANVAULT_POLL_INTERVAL_SECS, falling back to the default.
pub fn poll_interval_from_env() -> Duration {
    let secs = std::env::var("SCANVAULT_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
    Duration::from_secs(secs)
}

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct StatusPoller;

impl StatusPoller {
    /// Start polling `scan_id`. The first check runs immediately.
    ///
    /// Intervals shorter than [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn start(client: ApiClient, scan_id: Uuid, interval: Duration) -> PollHandle {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (sender, receiver) = watch::channel(None);
        let task = tokio::spawn(poll_loop(client, scan_id, interval, sender));
        PollHandle { receiver, task }
    }
}

async fn poll_loop(
    client: ApiClient,
    scan_id: Uuid,
    interval: Duration,
    sender: watch::Sender<Option<ScanCheckResponse>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match client.check_scan(scan_id, None).await {
            Ok(response) => {
                let status = response.status;
                tracing::debug!(scan_id = %scan_id, status = %status, "Scan status polled");
                sender.send_replace(Some(response));
                if status.is_terminal() {
                    tracing::info!(scan_id = %scan_id, status = %status, "Scan reached terminal status");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(scan_id = %scan_id, error = %e, "Status check failed, will retry");
            }
        }
    }
}

/// Handle to a running poll. Dropping it stops the poll.
pub struct PollHandle {
    receiver: watch::Receiver<Option<ScanCheckResponse>>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Most recent response, if any check has succeeded yet.
    pub fn latest(&self) -> Option<ScanCheckResponse> {
        self.receiver.borrow().clone()
    }

    /// A receiver that observes every published response.
    pub fn subscribe(&self) -> watch::Receiver<Option<ScanCheckResponse>> {
        self.receiver.clone()
    }

    /// Stop polling now.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for a terminal response. `None` if the poll was cancelled first.
    pub async fn wait_terminal(mut self) -> Option<ScanCheckResponse> {
        self.receiver
            .wait_for(|latest| latest.as_ref().is_some_and(|r| r.status.is_terminal()))
            .await
            .ok()
            .and_then(|latest| latest.clone())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Auth;
    use scanvault_core::models::ScanStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const INTERVAL: Duration = Duration::from_millis(20);

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(server.url(), Auth::Bearer("session-token".to_string())).unwrap()
    }

    fn check_path(scan_id: Uuid) -> String {
        format!("/api/v1/scans/{}/check", scan_id)
    }

    /// Check endpoint answering SCANNING for the first `scanning_for` calls,
    /// then `terminal`. Returns the call counter.
    async fn scripted_check(
        server: &mut mockito::ServerGuard,
        scan_id: Uuid,
        scanning_for: usize,
        terminal: &'static str,
    ) -> (mockito::Mock, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mock = server
            .mock("GET", check_path(scan_id).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = if n < scanning_for { "SCANNING" } else { terminal };
                format!(r#"{{"status":"{}"}}"#, status).into_bytes()
            })
            .create_async()
            .await;
        (mock, calls)
    }

    #[tokio::test]
    async fn test_poller_stops_on_completed() {
        let mut server = mockito::Server::new_async().await;
        let scan_id = Uuid::new_v4();
        let (_mock, calls) = scripted_check(&mut server, scan_id, 2, "COMPLETED").await;

        let handle = StatusPoller::start(client_for(&server), scan_id, INTERVAL);
        let terminal = tokio::time::timeout(Duration::from_secs(5), handle.wait_terminal())
            .await
            .expect("poll timed out")
            .expect("terminal response");
        assert_eq!(terminal.status, ScanStatus::Completed);

        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poller_stops_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        let scan_id = Uuid::new_v4();
        let (_mock, _calls) = scripted_check(&mut server, scan_id, 0, "ERROR").await;

        let handle = StatusPoller::start(client_for(&server), scan_id, INTERVAL);
        let terminal = tokio::time::timeout(Duration::from_secs(5), handle.wait_terminal())
            .await
            .expect("poll timed out")
            .expect("terminal response");
        assert_eq!(terminal.status, ScanStatus::Error);
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let mut server = mockito::Server::new_async().await;
        let scan_id = Uuid::new_v4();
        let (_mock, calls) = scripted_check(&mut server, scan_id, 2, "COMPLETED").await;

        let handle = StatusPoller::start(client_for(&server), scan_id, Duration::ZERO);
        let terminal = tokio::time::timeout(Duration::from_secs(5), handle.wait_terminal())
            .await
            .expect("poll timed out")
            .expect("terminal response");
        assert_eq!(terminal.status, ScanStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poller_survives_failed_checks() {
        let mut server = mockito::Server::new_async().await;
        let scan_id = Uuid::new_v4();
        let failing = server
            .mock("GET", check_path(scan_id).as_str())
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let handle = StatusPoller::start(client_for(&server), scan_id, INTERVAL);
        tokio::time::sleep(INTERVAL * 4).await;
        assert!(handle.latest().is_none());
        assert!(!handle.is_finished());

        failing.remove_async().await;
        let (_mock, _calls) = scripted_check(&mut server, scan_id, 0, "COMPLETED").await;

        let terminal = tokio::time::timeout(Duration::from_secs(5), handle.wait_terminal())
            .await
            .expect("poll timed out")
            .expect("terminal response");
        assert_eq!(terminal.status, ScanStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_stops_polling() {
        let mut server = mockito::Server::new_async().await;
        let scan_id = Uuid::new_v4();
        let (_mock, calls) = scripted_check(&mut server, scan_id, usize::MAX, "COMPLETED").await;

        let handle = StatusPoller::start(client_for(&server), scan_id, INTERVAL);
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(handle.latest().map(|r| r.status), Some(ScanStatus::Scanning));

        handle.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle.wait_terminal())
            .await
            .expect("cancelled poll should resolve");
        assert!(result.is_none());

        let seen = calls.load(Ordering::SeqCst);
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_drop_stops_polling() {
        let mut server = mockito::Server::new_async().await;
        let scan_id = Uuid::new_v4();
        let (_mock, calls) = scripted_check(&mut server, scan_id, usize::MAX, "COMPLETED").await;

        let handle = StatusPoller::start(client_for(&server), scan_id, INTERVAL);
        tokio::time::sleep(INTERVAL * 3).await;
        drop(handle);

        // Let an in-flight request settle before sampling.
        tokio::time::sleep(INTERVAL * 2).await;
        let seen = calls.load(Ordering::SeqCst);
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }
}
