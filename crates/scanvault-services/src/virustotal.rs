//! VirusTotal v3 gateway
//!
//! Translates local submit/lookup calls into the vendor's HTTP protocol. The
//! gateway owns no state; every lookup bypasses intermediate caches because the
//! analysis behind one id keeps changing until the vendor finishes.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use scanvault_core::models::{AnalysisReport, DetectionStats, EngineResult};
use scanvault_core::{AppError, Config};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

/// Failure talking to the scanning vendor.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to scanning service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("scanning service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed scanning service response: {0}")]
    MalformedResponse(String),

    #[error("scanning service misconfigured: {0}")]
    Configuration(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Gateway(err.to_string())
    }
}

/// Submission and lookup against an external malware-scanning vendor.
#[async_trait]
pub trait ScanGateway: Send + Sync {
    /// Upload a file and return the vendor's analysis id.
    async fn submit_file(&self, file_name: &str, data: Bytes) -> Result<String, GatewayError>;

    /// Fetch the current analysis for `external_reference_id`, never from cache.
    async fn fetch_analysis(
        &self,
        external_reference_id: &str,
    ) -> Result<AnalysisReport, GatewayError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct SubmittedAnalysis {
    id: Option<String>,
}

#[derive(Deserialize)]
struct AnalysisData {
    id: Option<String>,
    attributes: Option<AnalysisAttributes>,
}

#[derive(Deserialize)]
struct AnalysisAttributes {
    status: Option<String>,
    #[serde(default)]
    stats: Option<DetectionStats>,
    #[serde(default)]
    results: Option<BTreeMap<String, EngineResult>>,
}

#[derive(Clone)]
pub struct VirusTotalGateway {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl Debug for VirusTotalGateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VirusTotalGateway")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl VirusTotalGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, GatewayError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "VirusTotal API key is empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                GatewayError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(
            config.virustotal_api_url(),
            config.virustotal_api_key(),
            config.virustotal_timeout_secs(),
        )
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_body(response: Response) -> Result<String, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ScanGateway for VirusTotalGateway {
    #[tracing::instrument(skip(self, data), fields(file_name = %file_name, size = data.len()))]
    async fn submit_file(&self, file_name: &str, data: Bytes) -> Result<String, GatewayError> {
        let part = Part::bytes(data.to_vec()).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .http_client
            .post(self.build_url("/files"))
            .header("x-apikey", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let envelope: Envelope<SubmittedAnalysis> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::MalformedResponse(format!("upload response: {}", e)))?;

        let analysis_id = envelope
            .data
            .and_then(|d| d.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::MalformedResponse("upload response has no data.id".to_string())
            })?;

        tracing::info!(analysis_id = %analysis_id, "File submitted to VirusTotal");
        Ok(analysis_id)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_analysis(
        &self,
        external_reference_id: &str,
    ) -> Result<AnalysisReport, GatewayError> {
        let response = self
            .http_client
            .get(self.build_url(&format!("/analyses/{}", external_reference_id)))
            .header("x-apikey", &self.api_key)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .header(reqwest::header::PRAGMA, "no-cache")
            .header(
                "X-Request-Timestamp",
                chrono::Utc::now().timestamp_millis().to_string(),
            )
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let envelope: Envelope<AnalysisData> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::MalformedResponse(format!("analysis response: {}", e)))?;

        let data = envelope.data.ok_or_else(|| {
            GatewayError::MalformedResponse("analysis response has no data".to_string())
        })?;
        let attributes = data.attributes.ok_or_else(|| {
            GatewayError::MalformedResponse("analysis response has no attributes".to_string())
        })?;
        let vendor_status = attributes.status.ok_or_else(|| {
            GatewayError::MalformedResponse("analysis response has no status".to_string())
        })?;

        tracing::debug!(vendor_status = %vendor_status, "Fetched VirusTotal analysis");

        Ok(AnalysisReport {
            analysis_id: data.id.unwrap_or_else(|| external_reference_id.to_string()),
            vendor_status,
            stats: attributes.stats,
            results: attributes.results,
        })
    }
}
