//! Configuration module
//!
//! This module provides configuration structures for the API and services,
//! including database, authentication, and scanning-vendor settings.

use std::env;

use crate::constants::{
    DEFAULT_HISTORY_PAGE_SIZE, DEFAULT_MAX_UPLOAD_SIZE_BYTES, DEFAULT_VIRUSTOTAL_API_URL,
    MAX_HISTORY_PAGE_SIZE,
};

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const VIRUSTOTAL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PORT: u16 = 4000;

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
}

/// Scan service configuration
#[derive(Clone, Debug)]
pub struct ScanServiceConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // VirusTotal
    pub virustotal_api_key: String,
    pub virustotal_api_url: String,
    pub virustotal_timeout_secs: u64,
    // Upload and history limits
    pub max_upload_size_bytes: u64,
    pub history_page_size: u32,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ScanServiceConfig>);

impl Config {
    fn inner(&self) -> &ScanServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ScanServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn virustotal_api_key(&self) -> &str {
        &self.inner().virustotal_api_key
    }

    pub fn virustotal_api_url(&self) -> &str {
        &self.inner().virustotal_api_url
    }

    pub fn virustotal_timeout_secs(&self) -> u64 {
        self.inner().virustotal_timeout_secs
    }

    pub fn max_upload_size_bytes(&self) -> u64 {
        self.inner().max_upload_size_bytes
    }

    pub fn history_page_size(&self) -> u32 {
        self.inner().history_page_size
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

impl ScanServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
        };

        let config = ScanServiceConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            virustotal_api_key: env::var("VIRUSTOTAL_API_KEY")
                .map_err(|_| anyhow::anyhow!("VIRUSTOTAL_API_KEY must be set"))?,
            virustotal_api_url: env::var("VIRUSTOTAL_API_URL")
                .unwrap_or_else(|_| DEFAULT_VIRUSTOTAL_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            virustotal_timeout_secs: env::var("VIRUSTOTAL_TIMEOUT_SECS")
                .unwrap_or_else(|_| VIRUSTOTAL_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(VIRUSTOTAL_TIMEOUT_SECS),
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_BYTES")
                .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE_BYTES),
            history_page_size: env::var("HISTORY_PAGE_SIZE")
                .unwrap_or_else(|_| DEFAULT_HISTORY_PAGE_SIZE.to_string())
                .parse()
                .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.virustotal_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("VIRUSTOTAL_API_KEY cannot be empty"));
        }

        if !self.virustotal_api_url.starts_with("http://")
            && !self.virustotal_api_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "VIRUSTOTAL_API_URL must be an http(s) URL"
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_BYTES cannot be 0"));
        }

        if self.history_page_size == 0 || self.history_page_size > MAX_HISTORY_PAGE_SIZE {
            return Err(anyhow::anyhow!(
                "HISTORY_PAGE_SIZE must be between 1 and {}",
                MAX_HISTORY_PAGE_SIZE
            ));
        }

        Ok(())
    }
}
