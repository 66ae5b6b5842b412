//! Domain methods for the ScanVault API client.
//!
//! Response types come from `scanvault_core::models`.

use crate::{api_prefix, ApiClient};
use anyhow::{Context, Result};
use scanvault_core::models::{
    HistoryResponse, ScanCheckResponse, ScanDetailsResponse, ScanRecord, ScanStats,
    UpsertUserRequest, UploadResponse, User,
};
use uuid::Uuid;

impl ApiClient {
    /// Upload a local file for scanning.
    pub async fn upload_file(&self, file_path: &str) -> Result<UploadResponse> {
        let path = std::path::Path::new(file_path);
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(anyhow::anyhow!("Invalid input: {}", path.display()));
        }
        let buffer = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", file_path))?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin");

        self.upload_bytes(filename, buffer).await
    }

    /// Upload in-memory content under `filename`.
    pub async fn upload_bytes(&self, filename: &str, data: Vec<u8>) -> Result<UploadResponse> {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(data).file_name(filename.to_string()),
        );

        self.post_multipart(&format!("{}/scans", api_prefix()), form)
            .await
    }

    /// Reconcile a scan with the vendor and return its current status.
    pub async fn check_scan(
        &self,
        scan_id: Uuid,
        external_reference_id: Option<&str>,
    ) -> Result<ScanCheckResponse> {
        let mut query = Vec::new();
        if let Some(reference) = external_reference_id {
            query.push(("external_reference_id", reference.to_string()));
        }
        self.get(&format!("{}/scans/{}/check", api_prefix(), scan_id), &query)
            .await
    }

    pub async fn get_scan(&self, scan_id: Uuid) -> Result<ScanRecord> {
        self.get(&format!("{}/scans/{}", api_prefix(), scan_id), &[])
            .await
    }

    pub async fn scan_details(&self, scan_id: Uuid) -> Result<ScanDetailsResponse> {
        self.get(&format!("{}/scans/{}/details", api_prefix(), scan_id), &[])
            .await
    }

    /// One page of the caller's history, newest first.
    pub async fn list_scans(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<HistoryResponse> {
        let mut query = Vec::new();
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }
        if let Some(per_page) = per_page {
            query.push(("per_page", per_page.to_string()));
        }
        self.get(&format!("{}/scans", api_prefix()), &query).await
    }

    pub async fn stats(&self) -> Result<ScanStats> {
        self.get(&format!("{}/stats", api_prefix()), &[]).await
    }

    /// Register the session's user, optionally setting a display name.
    pub async fn upsert_me(&self, name: Option<String>) -> Result<User> {
        self.put_json(
            &format!("{}/users/me", api_prefix()),
            &UpsertUserRequest { name },
        )
        .await
    }
}
