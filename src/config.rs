// Configuration - Environment variables

use std::env;
use std::time::Duration;

/// Where complaints are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "firestore" => Some(StoreBackend::Firestore),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Gemini API key; without it every complaint uses the keyword fallback
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Upper bound on a single analysis call
    pub ai_timeout: Duration,
    pub store_backend: StoreBackend,
    /// Firebase project ID
    pub firebase_project_id: String,
    pub firestore_database: String,
    pub firestore_emulator_host: Option<String>,
    /// Google Application Credentials path for Firestore
    pub google_application_credentials: Option<String>,
    pub complaints_collection: String,
    pub log_file: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            gemini_api_key: get("GEMINI_API_KEY").filter(|k| !k.is_empty()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            ai_timeout: Duration::from_secs(
                get("AI_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            store_backend: get("STORE_BACKEND")
                .and_then(|s| StoreBackend::parse(&s))
                .unwrap_or(StoreBackend::Firestore),
            firebase_project_id: get("FIREBASE_PROJECT_ID")
                .or_else(|| get("GCP_PROJECT_ID"))
                .unwrap_or_else(|| "cpa-backend".to_string()),
            firestore_database: get("FIRESTORE_DATABASE").unwrap_or_else(|| "(default)".to_string()),
            firestore_emulator_host: get("FIRESTORE_EMULATOR_HOST"),
            google_application_credentials: get("GOOGLE_APPLICATION_CREDENTIALS"),
            complaints_collection: get("COMPLAINTS_COLLECTION")
                .unwrap_or_else(|| "complaints".to_string()),
            log_file: get("LOG_FILE").unwrap_or_else(|| "/tmp/cpa.log".to_string()),
        }
    }

    /// Warn about missing optional configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set - complaints will be classified by keyword fallback");
        }
        if self.store_backend == StoreBackend::Firestore
            && self.firestore_emulator_host.is_none()
            && self.google_application_credentials.is_none()
        {
            tracing::warn!("GOOGLE_APPLICATION_CREDENTIALS not set - Firestore will use default credentials");
        }
        if self.store_backend == StoreBackend::Memory {
            tracing::warn!("STORE_BACKEND=memory - complaints will not survive a restart");
        }
        if self.ai_timeout.is_zero() {
            return Err("AI_TIMEOUT_SECS must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini_api_key, None);
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.ai_timeout, Duration::from_secs(30));
        assert_eq!(config.store_backend, StoreBackend::Firestore);
        assert_eq!(config.complaints_collection, "complaints");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "5000"),
            ("GEMINI_API_KEY", "k"),
            ("STORE_BACKEND", "Memory"),
            ("GCP_PROJECT_ID", "city-hall"),
            ("AI_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.gemini_api_key.as_deref(), Some("k"));
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.firebase_project_id, "city-hall");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config(&[("PORT", "http"), ("STORE_BACKEND", "postgres"), ("GEMINI_API_KEY", "")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.store_backend, StoreBackend::Firestore);
        assert_eq!(config.gemini_api_key, None);
    }
}
