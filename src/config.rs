//! Application configuration loaded from environment variables.
//!
//! Every external credential is optional. A missing credential degrades the
//! component that needs it to its fallback behavior instead of failing startup.

use std::env;

const DEFAULT_COMPLETION_HOST: &str = "https://dashscope.aliyuncs.com";
const DEFAULT_AMAP_REST_HOST: &str = "https://restapi.amap.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID; `None` runs the document store offline
    pub gcp_project_id: Option<String>,
    /// Server port
    pub port: u16,
    /// Base URL of the completion endpoint
    pub completion_host: String,
    /// Completion application ID
    pub completion_app_id: Option<String>,
    /// Base URL of the AMap REST API (geocoding, static maps)
    pub amap_rest_host: String,

    // --- Secrets ---
    /// Completion API key
    pub completion_api_key: Option<String>,
    /// AMap API key
    pub amap_api_key: Option<String>,
    /// AMap security code (optional even when the key is present)
    pub amap_security_code: Option<String>,
    /// HS256 key shared with the identity provider for session tokens
    pub identity_signing_key: Option<Vec<u8>>,
}

impl Config {
    /// Default config for testing only. No credentials are set.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: None,
            port: 8080,
            completion_host: DEFAULT_COMPLETION_HOST.to_string(),
            completion_app_id: None,
            amap_rest_host: DEFAULT_AMAP_REST_HOST.to_string(),
            completion_api_key: None,
            amap_api_key: None,
            amap_security_code: None,
            identity_signing_key: Some(b"test_identity_key_32_bytes_min!!".to_vec()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present. Only malformed values are
    /// errors; absent values fall back to defaults or `None`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            Err(_) => 8080,
        };

        let config = Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: optional_var("GCP_PROJECT_ID"),
            port,
            completion_host: optional_var("COMPLETION_HOST")
                .unwrap_or_else(|| DEFAULT_COMPLETION_HOST.to_string()),
            completion_app_id: optional_var("DASHSCOPE_APP_ID"),
            amap_rest_host: optional_var("AMAP_REST_HOST")
                .unwrap_or_else(|| DEFAULT_AMAP_REST_HOST.to_string()),
            completion_api_key: optional_var("DASHSCOPE_API_KEY"),
            amap_api_key: optional_var("AMAP_API_KEY"),
            amap_security_code: optional_var("AMAP_SECURITY_CODE"),
            identity_signing_key: optional_var("IDENTITY_SIGNING_KEY").map(String::into_bytes),
        };

        config.log_degraded_components();
        Ok(config)
    }

    /// Whether both completion credentials are present.
    pub fn has_completion_credentials(&self) -> bool {
        self.completion_api_key.is_some() && self.completion_app_id.is_some()
    }

    fn log_degraded_components(&self) {
        if self.completion_api_key.is_none() {
            tracing::warn!("DASHSCOPE_API_KEY not set, itinerary generation uses fallback data");
        }
        if self.completion_app_id.is_none() {
            tracing::warn!("DASHSCOPE_APP_ID not set, itinerary generation uses fallback data");
        }
        if self.amap_api_key.is_none() {
            tracing::warn!("AMAP_API_KEY not set, maps render as placeholders");
        }
        if self.gcp_project_id.is_none() {
            tracing::warn!("GCP_PROJECT_ID not set, itineraries are kept local only");
        }
        if self.identity_signing_key.is_none() {
            tracing::warn!("IDENTITY_SIGNING_KEY not set, all requests are anonymous");
        }
    }
}

/// Read an environment variable, treating empty or whitespace values as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
