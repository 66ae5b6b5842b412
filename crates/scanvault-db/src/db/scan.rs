//! Scan record repository: CRUD and conditional transitions for `scan_records`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scanvault_core::models::{FileMeta, ScanRecord, ScanStats, ScanStatus};
use scanvault_core::{AppError, ScanStore};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const SCAN_COLUMNS: &str =
    "id, user_id, file_name, file_size, external_reference_id, status, created_at, updated_at";

/// Aggregate row for the per-user dashboard counters.
#[derive(Debug, sqlx::FromRow)]
struct ScanStatsRow {
    total_scans: i64,
    completed: i64,
    in_progress: i64,
    failed: i64,
    last_scan_at: Option<DateTime<Utc>>,
}

impl ScanStatsRow {
    fn into_stats(self) -> ScanStats {
        ScanStats {
            total_scans: self.total_scans,
            completed: self.completed,
            in_progress: self.in_progress,
            failed: self.failed,
            threats_detected: self.failed,
            last_scan_at: self.last_scan_at,
        }
    }
}

#[derive(Clone)]
pub struct ScanRepository {
    pool: PgPool,
}

impl ScanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanStore for ScanRepository {
    #[tracing::instrument(skip(self, meta), fields(db.table = "scan_records", user_id = %user_id))]
    async fn insert_pending(
        &self,
        user_id: Uuid,
        meta: &FileMeta,
    ) -> Result<ScanRecord, AppError> {
        let file_size = i64::try_from(meta.file_size)
            .map_err(|_| AppError::InvalidInput("File size out of range".to_string()))?;

        let query = format!(
            r#"
            INSERT INTO scan_records (user_id, file_name, file_size, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {SCAN_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<Postgres, ScanRecord>(&query)
            .bind(user_id)
            .bind(&meta.file_name)
            .bind(file_size)
            .bind(ScanStatus::Pending)
            .fetch_one(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "scan_records", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<ScanRecord>, AppError> {
        let query = format!("SELECT {SCAN_COLUMNS} FROM scan_records WHERE id = $1");
        let record = sqlx::query_as::<Postgres, ScanRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "scan_records", db.record_id = %id))]
    async fn mark_scanning(
        &self,
        id: Uuid,
        external_reference_id: &str,
    ) -> Result<Option<ScanRecord>, AppError> {
        let query = format!(
            r#"
            UPDATE scan_records
            SET status = $2, external_reference_id = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING {SCAN_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<Postgres, ScanRecord>(&query)
            .bind(id)
            .bind(ScanStatus::Scanning)
            .bind(external_reference_id)
            .bind(ScanStatus::Pending)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "scan_records", db.record_id = %id))]
    async fn transition(
        &self,
        id: Uuid,
        from: ScanStatus,
        to: ScanStatus,
    ) -> Result<Option<ScanRecord>, AppError> {
        if !from.can_transition_to(to) {
            return Err(AppError::Internal(format!(
                "Illegal scan transition {} -> {}",
                from, to
            )));
        }

        let query = format!(
            r#"
            UPDATE scan_records
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {SCAN_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<Postgres, ScanRecord>(&query)
            .bind(id)
            .bind(to)
            .bind(from)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "scan_records", user_id = %user_id))]
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScanRecord>, AppError> {
        let query = format!(
            r#"
            SELECT {SCAN_COLUMNS}
            FROM scan_records
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let records = sqlx::query_as::<Postgres, ScanRecord>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(db.table = "scan_records", user_id = %user_id))]
    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM scan_records WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "scan_records", user_id = %user_id))]
    async fn stats_for_user(&self, user_id: Uuid) -> Result<ScanStats, AppError> {
        let row = sqlx::query_as::<Postgres, ScanStatsRow>(
            r#"
            SELECT
                COUNT(*) AS total_scans,
                COUNT(*) FILTER (WHERE status = 'COMPLETED') AS completed,
                COUNT(*) FILTER (WHERE status IN ('PENDING', 'SCANNING')) AS in_progress,
                COUNT(*) FILTER (WHERE status = 'ERROR') AS failed,
                MAX(created_at) AS last_scan_at
            FROM scan_records
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_stats())
    }
}
