//! Shared HTTP client for the ScanVault API.
//!
//! Provides a minimal client with Bearer session auth, generic GET/POST/PUT
//! helpers, the domain methods in [`api`] and the cancellable [`poller`].
//! The CLI uses this client directly.

pub mod api;
pub mod poller;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No credentials (health check only).
    Anonymous,
}

/// API version prefix (e.g. "/api/v1"). Set SCANVAULT_API_VERSION to match the server.
pub fn api_prefix() -> String {
    let version = std::env::var("SCANVAULT_API_VERSION").unwrap_or_else(|_| "v1".to_string());
    format!("/api/{}", version)
}

/// HTTP client for the ScanVault API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create client from environment: SCANVAULT_API_URL (or API_URL), SCANVAULT_TOKEN (or JWT_TOKEN).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SCANVAULT_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:4000".to_string());

        let token = std::env::var("SCANVAULT_TOKEN")
            .or_else(|_| std::env::var("JWT_TOKEN"))
            .context("Missing session token. Set SCANVAULT_TOKEN or JWT_TOKEN")?;

        Self::new(base_url, Auth::Bearer(token))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Anonymous => request,
        }
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.apply_auth(self.client.get(self.build_url(path)));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        parse_response(response).await
    }

    /// PUT JSON body and deserialize response.
    pub async fn put_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.apply_auth(self.client.put(self.build_url(path)).json(body));
        let response = request.send().await.context("Failed to send request")?;
        parse_response(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let request = self.apply_auth(self.client.post(self.build_url(path)).multipart(form));
        let response = request.send().await.context("Failed to send request")?;
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow::anyhow!(
            "API request failed with status {}: {}",
            status,
            error_text
        ));
    }

    response
        .json()
        .await
        .context("Failed to parse response as JSON")
}

// Re-export domain response types for convenience.
pub use poller::{PollHandle, StatusPoller};
pub use scanvault_core::models::{
    AnalysisReport, HistoryResponse, ScanCheckResponse, ScanDetailsResponse, ScanRecord,
    ScanStats, ScanStatus, UploadResponse, User,
};
