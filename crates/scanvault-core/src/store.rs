//! Persistence traits for scan records and users
//!
//! The lifecycle controller talks to these traits rather than to a concrete
//! database so that it can be driven by in-memory fakes in tests. The Postgres
//! implementations live in `scanvault-db`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FileMeta, ScanRecord, ScanStats, ScanStatus, User};

/// Storage for scan records.
///
/// Every state-changing method is conditional on the current stored status and
/// returns `Ok(None)` when that precondition no longer holds, so concurrent
/// requests for the same record commit at most one transition.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Insert a new record in `PENDING` with no external reference.
    async fn insert_pending(&self, user_id: Uuid, meta: &FileMeta)
        -> Result<ScanRecord, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<ScanRecord>, AppError>;

    /// `PENDING -> SCANNING`, setting the external reference in the same write.
    async fn mark_scanning(
        &self,
        id: Uuid,
        external_reference_id: &str,
    ) -> Result<Option<ScanRecord>, AppError>;

    /// Move `from -> to` only if the stored status is still `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: ScanStatus,
        to: ScanStatus,
    ) -> Result<Option<ScanRecord>, AppError>;

    /// Records owned by `user_id`, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScanRecord>, AppError>;

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, AppError>;

    async fn stats_for_user(&self, user_id: Uuid) -> Result<ScanStats, AppError>;
}

/// Lookup and registration of users known to the service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create the user on first sight, otherwise update the name when given.
    async fn upsert(&self, email: &str, name: Option<&str>) -> Result<User, AppError>;
}
