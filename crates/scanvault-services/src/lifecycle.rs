//! Scan lifecycle controller
//!
//! Owns every legal transition of a scan record:
//!
//! ```text
//! (create) -> PENDING
//! PENDING  --submit ok-------------> SCANNING (reference set in the same write)
//! PENDING  --submit failed---------> ERROR
//! SCANNING --vendor completed------> COMPLETED
//! SCANNING --lookup failed/failed--> ERROR
//! SCANNING --anything else---------> SCANNING
//! ```
//!
//! All writes go through the store's conditional updates. When a write finds
//! the record already moved on, the controller re-reads and returns the stored
//! record instead of failing.

use bytes::Bytes;
use scanvault_core::constants::{
    DEFAULT_HISTORY_PAGE_SIZE, DEFAULT_MAX_UPLOAD_SIZE_BYTES, MAX_HISTORY_PAGE_SIZE,
};
use scanvault_core::models::{
    AnalysisReport, FileMeta, Page, ScanDetails, ScanRecord, ScanStats, ScanStatus, User,
    VendorOutcome,
};
use scanvault_core::{AppError, Config, ScanStore, UserDirectory};
use std::sync::Arc;
use uuid::Uuid;

use crate::virustotal::ScanGateway;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Limits applied by the controller.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub max_upload_size_bytes: u64,
    pub default_page_size: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_BYTES,
            default_page_size: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }
}

impl LifecycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_size_bytes: config.max_upload_size_bytes(),
            default_page_size: config.history_page_size(),
        }
    }
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub record: ScanRecord,
    /// Present only when this call actually reached the vendor.
    pub analysis: Option<AnalysisReport>,
}

#[derive(Clone)]
pub struct ScanLifecycleController {
    scans: Arc<dyn ScanStore>,
    users: Arc<dyn UserDirectory>,
    gateway: Arc<dyn ScanGateway>,
    settings: LifecycleSettings,
}

impl ScanLifecycleController {
    pub fn new(
        scans: Arc<dyn ScanStore>,
        users: Arc<dyn UserDirectory>,
        gateway: Arc<dyn ScanGateway>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            scans,
            users,
            gateway,
            settings,
        }
    }

    /// Resolve the session's email to a known user.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_user(&self, email: &str) -> Result<User, AppError> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Create the user on first login, or update the display name.
    #[tracing::instrument(skip(self))]
    pub async fn register_user(&self, email: &str, name: Option<&str>) -> Result<User, AppError> {
        if email.trim().is_empty() {
            return Err(AppError::InvalidInput("Email is required".to_string()));
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        self.users.upsert(email, name).await
    }

    /// Validate the upload and persist a new `PENDING` record.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn create_pending(
        &self,
        meta: &FileMeta,
        user_id: Uuid,
    ) -> Result<ScanRecord, AppError> {
        if meta.file_name.trim().is_empty() {
            return Err(AppError::InvalidInput("File name is required".to_string()));
        }
        if meta.file_size > self.settings.max_upload_size_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File size exceeds {} limit",
                format_limit(self.settings.max_upload_size_bytes)
            )));
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let record = self.scans.insert_pending(user_id, meta).await?;
        tracing::info!(scan_id = %record.id, file_size = meta.file_size, "Scan record created");
        Ok(record)
    }

    /// Hand the file to the vendor: `PENDING -> SCANNING | ERROR`.
    ///
    /// A record that is no longer `PENDING` is returned untouched, so calling
    /// this twice never submits the same record twice.
    #[tracing::instrument(skip(self, data), fields(scan_id = %scan_id, size = data.len()))]
    pub async fn submit(&self, scan_id: Uuid, data: Bytes) -> Result<ScanRecord, AppError> {
        let record = self.load(scan_id).await?;
        if record.status != ScanStatus::Pending {
            tracing::debug!(status = %record.status, "Scan already submitted, skipping");
            return Ok(record);
        }

        match self.gateway.submit_file(&record.file_name, data).await {
            Ok(reference) => match self.scans.mark_scanning(scan_id, &reference).await? {
                Some(updated) => {
                    tracing::info!(external_reference_id = %reference, "Scan submitted");
                    Ok(updated)
                }
                None => self.load(scan_id).await,
            },
            Err(err) => {
                tracing::warn!(error = %err, "Scan submission failed");
                if self.commit_error(scan_id, ScanStatus::Pending).await {
                    Err(err.into())
                } else {
                    // Another caller moved the record on; report what it stored.
                    self.load(scan_id).await
                }
            }
        }
    }

    /// Bring a record up to date with the vendor.
    ///
    /// Terminal and `PENDING` records are returned as stored with no vendor
    /// call. A `SCANNING` record costs exactly one lookup. A failed lookup
    /// commits `ERROR` and then returns the gateway error, unless another
    /// caller settled the record first, in which case that record is returned.
    #[tracing::instrument(skip(self), fields(scan_id = %scan_id))]
    pub async fn reconcile(&self, scan_id: Uuid) -> Result<Reconciliation, AppError> {
        let record = self.load(scan_id).await?;
        match record.status {
            ScanStatus::Pending | ScanStatus::Completed | ScanStatus::Error => {
                return Ok(Reconciliation {
                    record,
                    analysis: None,
                })
            }
            ScanStatus::Scanning => {}
        }

        let Some(reference) = record.external_reference_id.clone() else {
            return Err(AppError::Internal(format!(
                "Scan {} is SCANNING without an external reference",
                scan_id
            )));
        };

        let report = match self.gateway.fetch_analysis(&reference).await {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(error = %err, "Analysis lookup failed");
                if self.commit_error(scan_id, ScanStatus::Scanning).await {
                    return Err(err.into());
                }
                return Ok(Reconciliation {
                    record: self.load(scan_id).await?,
                    analysis: None,
                });
            }
        };

        let next = match report.outcome() {
            VendorOutcome::Completed => Some(ScanStatus::Completed),
            VendorOutcome::Failed => Some(ScanStatus::Error),
            VendorOutcome::StillRunning => None,
        };

        let record = match next {
            Some(to) => match self.scans.transition(scan_id, ScanStatus::Scanning, to).await? {
                Some(updated) => {
                    tracing::info!(status = %to, vendor_status = %report.vendor_status, "Scan reconciled");
                    updated
                }
                None => self.load(scan_id).await?,
            },
            None => {
                tracing::debug!(vendor_status = %report.vendor_status, "Scan still running");
                record
            }
        };

        Ok(Reconciliation {
            record,
            analysis: Some(report),
        })
    }

    /// Reconcile on behalf of the owner, optionally checking the vendor reference.
    #[tracing::instrument(skip(self), fields(scan_id = %scan_id, user_id = %user_id))]
    pub async fn check(
        &self,
        scan_id: Uuid,
        user_id: Uuid,
        expected_reference: Option<&str>,
    ) -> Result<Reconciliation, AppError> {
        let record = self.find_owned(scan_id, user_id).await?;
        if let (Some(expected), Some(stored)) =
            (expected_reference, record.external_reference_id.as_deref())
        {
            if expected != stored {
                return Err(AppError::InvalidInput(
                    "external_reference_id does not match this scan".to_string(),
                ));
            }
        }
        self.reconcile(scan_id).await
    }

    /// `create_pending` followed by `submit`.
    #[tracing::instrument(skip(self, data), fields(user_id = %user_id))]
    pub async fn upload(
        &self,
        user_id: Uuid,
        meta: FileMeta,
        data: Bytes,
    ) -> Result<ScanRecord, AppError> {
        let record = self.create_pending(&meta, user_id).await?;
        self.submit(record.id, data).await
    }

    /// The record, if it exists and belongs to `user_id`.
    pub async fn find_owned(&self, scan_id: Uuid, user_id: Uuid) -> Result<ScanRecord, AppError> {
        let record = self.load(scan_id).await?;
        if record.user_id != user_id {
            return Err(AppError::NotFound("Scan not found".to_string()));
        }
        Ok(record)
    }

    /// Newest-first page of the user's scans. `page` is 1-based.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn history(
        &self,
        user_id: Uuid,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<ScanRecord>, AppError> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(self.settings.default_page_size)
            .clamp(1, MAX_HISTORY_PAGE_SIZE);
        let offset = (page as i64 - 1) * per_page as i64;

        let items = self
            .scans
            .list_for_user(user_id, per_page as i64, offset)
            .await?;
        let total = self.scans.count_for_user(user_id).await?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Owned record plus the vendor analysis when one can be fetched.
    ///
    /// Lookup failures leave `analysis` empty rather than failing the call.
    #[tracing::instrument(skip(self), fields(scan_id = %scan_id, user_id = %user_id))]
    pub async fn details(&self, scan_id: Uuid, user_id: Uuid) -> Result<ScanDetails, AppError> {
        let record = self.find_owned(scan_id, user_id).await?;

        match record.status {
            ScanStatus::Scanning => match self.reconcile(scan_id).await {
                Ok(reconciled) => Ok(ScanDetails {
                    record: reconciled.record,
                    analysis: reconciled.analysis,
                }),
                Err(AppError::Gateway(_)) => Ok(ScanDetails {
                    record: self.load(scan_id).await?,
                    analysis: None,
                }),
                Err(err) => Err(err),
            },
            ScanStatus::Completed | ScanStatus::Error => {
                let analysis = match record.external_reference_id.as_deref() {
                    Some(reference) => match self.gateway.fetch_analysis(reference).await {
                        Ok(report) => Some(report),
                        Err(err) => {
                            tracing::warn!(error = %err, "Failed to fetch analysis details");
                            None
                        }
                    },
                    None => None,
                };
                Ok(ScanDetails { record, analysis })
            }
            ScanStatus::Pending => Ok(ScanDetails {
                record,
                analysis: None,
            }),
        }
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn stats(&self, user_id: Uuid) -> Result<ScanStats, AppError> {
        self.scans.stats_for_user(user_id).await
    }

    async fn load(&self, scan_id: Uuid) -> Result<ScanRecord, AppError> {
        self.scans
            .get(scan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Scan not found".to_string()))
    }

    /// Commit `from -> ERROR`. A store failure here is logged so the caller
    /// still sees the gateway error that caused it.
    /// Returns `false` only when another caller already moved the record
    /// out of `from`.
    async fn commit_error(&self, scan_id: Uuid, from: ScanStatus) -> bool {
        match self.scans.transition(scan_id, from, ScanStatus::Error).await {
            Ok(Some(_)) => {
                tracing::info!(scan_id = %scan_id, "Scan marked as ERROR");
                true
            }
            Ok(None) => {
                tracing::debug!(scan_id = %scan_id, "Scan already left {}, ERROR not applied", from);
                false
            }
            Err(err) => {
                tracing::error!(scan_id = %scan_id, error = %err, "Failed to mark scan as ERROR");
                true
            }
        }
    }
}

fn format_limit(bytes: u64) -> String {
    if bytes % BYTES_PER_MB == 0 {
        format!("{}MB", bytes / BYTES_PER_MB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::mock_controller;
    use std::time::Duration;

    const MB: u64 = 1024 * 1024;

    fn file(size: u64) -> FileMeta {
        FileMeta::new("sample.bin", size)
    }

    fn payload() -> Bytes {
        Bytes::from_static(b"MZ\x90\x00")
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected_without_record() {
        let (controller, scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");

        let err = controller
            .upload(user.id, file(10 * MB), payload())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge(ref m) if m.contains("exceeds 5MB limit")));
        assert!(err.is_validation());
        assert!(scans.is_empty());
        assert_eq!(gateway.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_rejected_without_record() {
        let (controller, scans, _users, gateway) = mock_controller();

        let err = controller
            .upload(Uuid::new_v4(), file(MB), payload())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(scans.is_empty());
        assert_eq!(gateway.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_file_name_rejected() {
        let (controller, scans, users, _gateway) = mock_controller();
        let user = users.add_user("alice@example.com");

        let err = controller
            .create_pending(&FileMeta::new("  ", 10), user.id)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(scans.is_empty());
    }

    #[tokio::test]
    async fn test_upload_then_reconcile_to_completed() {
        let (controller, scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");

        let pending = controller.create_pending(&file(MB), user.id).await.unwrap();
        assert_eq!(pending.status, ScanStatus::Pending);
        assert!(pending.external_reference_id.is_none());

        let scanning = controller.submit(pending.id, payload()).await.unwrap();
        assert_eq!(scanning.status, ScanStatus::Scanning);
        assert_eq!(
            scanning.external_reference_id.as_deref(),
            Some("analysis-1")
        );

        gateway.set_vendor_status("queued");
        let still = controller.reconcile(pending.id).await.unwrap();
        assert_eq!(still.record.status, ScanStatus::Scanning);
        assert!(still.analysis.is_some());

        gateway.set_vendor_status("completed");
        let done = controller.reconcile(pending.id).await.unwrap();
        assert_eq!(done.record.status, ScanStatus::Completed);
        assert_eq!(
            done.analysis.map(|a| a.vendor_status),
            Some("completed".to_string())
        );
        assert_eq!(
            scans.record(pending.id).unwrap().status,
            ScanStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_failed_submission_commits_error_without_reference() {
        let (controller, scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        gateway.fail_submissions(true);

        let record = controller.create_pending(&file(MB), user.id).await.unwrap();
        let err = controller.submit(record.id, payload()).await.unwrap_err();

        assert!(matches!(err, AppError::Gateway(_)));
        let stored = scans.record(record.id).unwrap();
        assert_eq!(stored.status, ScanStatus::Error);
        assert!(stored.external_reference_id.is_none());
    }

    #[tokio::test]
    async fn test_submit_is_noop_once_submitted() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");

        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        let again = controller.submit(record.id, payload()).await.unwrap();

        assert_eq!(again.status, ScanStatus::Scanning);
        assert_eq!(again.external_reference_id, record.external_reference_id);
        assert_eq!(gateway.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_terminal_makes_no_gateway_call() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        gateway.set_vendor_status("completed");

        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        controller.reconcile(record.id).await.unwrap();
        assert_eq!(gateway.fetch_calls(), 1);

        let first = controller.reconcile(record.id).await.unwrap();
        let second = controller.reconcile(record.id).await.unwrap();

        assert_eq!(first.record, second.record);
        assert_eq!(first.record.status, ScanStatus::Completed);
        assert!(first.analysis.is_none());
        assert_eq!(gateway.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_pending_is_untouched() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");

        let record = controller.create_pending(&file(MB), user.id).await.unwrap();
        let result = controller.reconcile(record.id).await.unwrap();

        assert_eq!(result.record.status, ScanStatus::Pending);
        assert_eq!(gateway.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_commits_error_then_surfaces() {
        let (controller, scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");

        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        gateway.fail_lookups(true);

        let err = controller.reconcile(record.id).await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));

        let stored = scans.record(record.id).unwrap();
        assert_eq!(stored.status, ScanStatus::Error);
        assert!(stored.external_reference_id.is_some());

        // Terminal now: later reconciles stay quiet.
        gateway.fail_lookups(false);
        let after = controller.reconcile(record.id).await.unwrap();
        assert_eq!(after.record.status, ScanStatus::Error);
        assert_eq!(gateway.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_vendor_failure_status_moves_to_error() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        gateway.set_vendor_status("failed");

        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        let result = controller.reconcile(record.id).await.unwrap();

        assert_eq!(result.record.status, ScanStatus::Error);
    }

    #[tokio::test]
    async fn test_unknown_vendor_status_keeps_scanning() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        gateway.set_vendor_status("something-new");

        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        let result = controller.reconcile(record.id).await.unwrap();

        assert_eq!(result.record.status, ScanStatus::Scanning);
    }

    #[tokio::test]
    async fn test_concurrent_reconcile_commits_completed_once() {
        let (controller, scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");

        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        let commits_after_submit = scans.committed_transitions();

        gateway.set_vendor_status("completed");
        gateway.set_lookup_delay(Duration::from_millis(20));

        let (a, b) = tokio::join!(
            controller.reconcile(record.id),
            controller.reconcile(record.id)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.record.status, ScanStatus::Completed);
        assert_eq!(b.record.status, ScanStatus::Completed);
        assert_eq!(gateway.fetch_calls(), 2);
        assert_eq!(scans.committed_transitions() - commits_after_submit, 1);
        assert_eq!(a.record.updated_at, b.record.updated_at);
    }

    #[tokio::test]
    async fn test_updated_at_moves_only_with_status_changes() {
        let (controller, scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");

        let pending = controller.create_pending(&file(MB), user.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let submitted = controller.submit(pending.id, payload()).await.unwrap();
        assert_eq!(submitted.status, ScanStatus::Scanning);
        assert!(submitted.updated_at > pending.updated_at);
        assert_eq!(submitted.created_at, pending.created_at);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let queued = controller.reconcile(pending.id).await.unwrap();
        assert_eq!(queued.record.status, ScanStatus::Scanning);
        assert_eq!(queued.record.updated_at, submitted.updated_at);
        assert_eq!(scans.record(pending.id).unwrap().updated_at, submitted.updated_at);

        tokio::time::sleep(Duration::from_millis(2)).await;
        gateway.set_vendor_status("completed");
        let completed = controller.reconcile(pending.id).await.unwrap().record;
        assert_eq!(completed.status, ScanStatus::Completed);
        assert!(completed.updated_at > submitted.updated_at);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let again = controller.reconcile(pending.id).await.unwrap().record;
        assert_eq!(again, completed);
        assert_eq!(scans.record(pending.id).unwrap().updated_at, completed.updated_at);
    }

    #[tokio::test]
    async fn test_lookup_failure_after_concurrent_completion_keeps_completed() {
        let (controller, scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();

        gateway.fail_lookups(true);
        gateway.set_lookup_delay(Duration::from_millis(50));

        // The record completes while this caller's lookup is in flight.
        let (result, committed) = tokio::join!(controller.reconcile(record.id), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            scans
                .transition(record.id, ScanStatus::Scanning, ScanStatus::Completed)
                .await
        });
        assert!(committed.unwrap().is_some());

        let reconciled = result.unwrap();
        assert_eq!(reconciled.record.status, ScanStatus::Completed);
        assert!(reconciled.analysis.is_none());
        assert_eq!(scans.record(record.id).unwrap().status, ScanStatus::Completed);
    }

    #[tokio::test]
    async fn test_history_newest_first_regardless_of_status() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        let other = users.add_user("bob@example.com");

        let first = controller.create_pending(&file(1), user.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = controller
            .upload(user.id, file(2), payload())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        gateway.fail_submissions(true);
        let third = controller.create_pending(&file(3), user.id).await.unwrap();
        let _ = controller.submit(third.id, payload()).await;
        controller.create_pending(&file(4), other.id).await.unwrap();

        let page = controller.history(user.id, None, None).await.unwrap();

        let ids: Vec<Uuid> = page.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(page.total, 3);
        assert_eq!(page.per_page, DEFAULT_HISTORY_PAGE_SIZE);
        assert_eq!(page.pages(), 1);
    }

    #[tokio::test]
    async fn test_history_pagination_bounds() {
        let (controller, _scans, users, _gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        for size in 0..5 {
            controller
                .create_pending(&file(size + 1), user.id)
                .await
                .unwrap();
        }

        let page = controller.history(user.id, Some(2), Some(2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pages(), 3);

        let clamped = controller.history(user.id, Some(0), Some(0)).await.unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.per_page, 1);
    }

    #[tokio::test]
    async fn test_find_owned_hides_other_users_scans() {
        let (controller, _scans, users, _gateway) = mock_controller();
        let owner = users.add_user("alice@example.com");
        let stranger = users.add_user("mallory@example.com");

        let record = controller.create_pending(&file(1), owner.id).await.unwrap();

        assert!(controller.find_owned(record.id, owner.id).await.is_ok());
        let err = controller
            .find_owned(record.id, stranger.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_check_rejects_mismatched_reference() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();

        let err = controller
            .check(record.id, user.id, Some("someone-else"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(gateway.fetch_calls(), 0);

        let ok = controller
            .check(record.id, user.id, Some("analysis-1"))
            .await
            .unwrap();
        assert_eq!(ok.record.status, ScanStatus::Scanning);
    }

    #[tokio::test]
    async fn test_details_tolerates_lookup_failure() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        gateway.fail_lookups(true);

        let details = controller.details(record.id, user.id).await.unwrap();
        assert!(details.analysis.is_none());
        assert_eq!(details.record.status, ScanStatus::Error);
    }

    #[tokio::test]
    async fn test_details_of_completed_scan_includes_analysis() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        gateway.set_vendor_status("completed");
        let record = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        controller.reconcile(record.id).await.unwrap();

        let details = controller.details(record.id, user.id).await.unwrap();
        assert_eq!(details.record.status, ScanStatus::Completed);
        assert!(details.analysis.is_some());
    }

    #[tokio::test]
    async fn test_stats_count_errors_as_threats() {
        let (controller, _scans, users, gateway) = mock_controller();
        let user = users.add_user("alice@example.com");
        gateway.set_vendor_status("completed");

        let ok = controller
            .upload(user.id, file(MB), payload())
            .await
            .unwrap();
        controller.reconcile(ok.id).await.unwrap();
        gateway.fail_submissions(true);
        let _ = controller.upload(user.id, file(MB), payload()).await;
        controller.create_pending(&file(1), user.id).await.unwrap();

        let stats = controller.stats(user.id).await.unwrap();
        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.threats_detected, 1);
        assert!(stats.last_scan_at.is_some());
    }

    #[tokio::test]
    async fn test_register_user_is_idempotent() {
        let (controller, _scans, _users, _gateway) = mock_controller();

        let created = controller
            .register_user("carol@example.com", Some("Carol"))
            .await
            .unwrap();
        let again = controller
            .register_user("carol@example.com", None)
            .await
            .unwrap();

        assert_eq!(created.id, again.id);
        assert_eq!(again.name.as_deref(), Some("Carol"));
        tokio_test::assert_ok!(controller.resolve_user("carol@example.com").await);
        assert!(controller.resolve_user("nobody@example.com").await.is_err());
    }

    #[test]
    fn test_format_limit() {
        assert_eq!(format_limit(5 * MB), "5MB");
        assert_eq!(format_limit(1500), "1500 bytes");
    }
}
