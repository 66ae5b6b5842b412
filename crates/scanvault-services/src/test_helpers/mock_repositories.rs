//! Mock repository implementations for testing
//!
//! These mocks honor the same conditional-update contract as the Postgres
//! repositories: a transition only commits while the stored status still
//! matches the expected one.

use async_trait::async_trait;
use chrono::Utc;
use scanvault_core::models::{FileMeta, ScanRecord, ScanStats, ScanStatus, User};
use scanvault_core::{AppError, ScanStore, UserDirectory};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock scan store keeping records in insertion order.
#[derive(Clone, Default)]
pub struct MockScanStore {
    records: Arc<Mutex<Vec<ScanRecord>>>,
    committed_transitions: Arc<AtomicUsize>,
}

impl MockScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&self, record: ScanRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn record(&self, id: Uuid) -> Option<ScanRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Status changes that actually committed (PENDING->SCANNING included).
    pub fn committed_transitions(&self) -> usize {
        self.committed_transitions.load(Ordering::SeqCst)
    }

    fn update_if<F>(&self, id: Uuid, expected: ScanStatus, apply: F) -> Option<ScanRecord>
    where
        F: FnOnce(&mut ScanRecord),
    {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id && r.status == expected)?;
        apply(record);
        record.updated_at = Utc::now();
        self.committed_transitions.fetch_add(1, Ordering::SeqCst);
        Some(record.clone())
    }
}

#[async_trait]
impl ScanStore for MockScanStore {
    async fn insert_pending(
        &self,
        user_id: Uuid,
        meta: &FileMeta,
    ) -> Result<ScanRecord, AppError> {
        let now = Utc::now();
        let record = ScanRecord {
            id: Uuid::new_v4(),
            user_id,
            file_name: meta.file_name.clone(),
            file_size: meta.file_size as i64,
            external_reference_id: None,
            status: ScanStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.add_record(record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScanRecord>, AppError> {
        Ok(self.record(id))
    }

    async fn mark_scanning(
        &self,
        id: Uuid,
        external_reference_id: &str,
    ) -> Result<Option<ScanRecord>, AppError> {
        Ok(self.update_if(id, ScanStatus::Pending, |r| {
            r.status = ScanStatus::Scanning;
            r.external_reference_id = Some(external_reference_id.to_string());
        }))
    }

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
        Ok(self.update_if(id, from, |r| r.status = to))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScanRecord>, AppError> {
        let mut owned: Vec<ScanRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps later inserts first on equal timestamps.
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .count() as i64)
    }

    async fn stats_for_user(&self, user_id: Uuid) -> Result<ScanStats, AppError> {
        let records = self.records.lock().unwrap();
        let owned: Vec<&ScanRecord> = records.iter().filter(|r| r.user_id == user_id).collect();
        let count = |status: ScanStatus| owned.iter().filter(|r| r.status == status).count() as i64;
        let failed = count(ScanStatus::Error);
        Ok(ScanStats {
            total_scans: owned.len() as i64,
            completed: count(ScanStatus::Completed),
            in_progress: count(ScanStatus::Pending) + count(ScanStatus::Scanning),
            failed,
            threats_detected: failed,
            last_scan_at: owned.iter().map(|r| r.created_at).max(),
        })
    }
}

/// Mock user directory keyed by email.
#[derive(Clone, Default)]
pub struct MockUserDirectory {
    users: Arc<Mutex<Vec<User>>>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user directly and return it.
    pub fn add_user(&self, email: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn upsert(&self, email: &str, name: Option<&str>) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users.iter_mut().find(|u| u.email == email) {
            if let Some(name) = name {
                existing.name = Some(name.to_string());
            }
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }
}
