//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Which document store backs the profile collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Cloud Firestore (production, or the emulator when
    /// `FIRESTORE_EMULATOR_HOST` is set).
    Firestore,
    /// Process-local store; data is lost on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase project ID (token audience and Firestore project)
    pub firebase_project_id: String,
    /// Document store backend
    pub store_backend: StoreBackend,
    /// Base URL of the text-generation endpoint; `None` runs without a model
    pub model_endpoint: Option<String>,
    /// Model identifier passed to the endpoint
    pub model_name: String,
    /// Maximum number of concurrent inference calls
    pub model_max_concurrency: usize,
    /// Frontend origin allowed by CORS (any origin when unset)
    pub frontend_url: Option<String>,
    /// Directory holding the web UI
    pub static_dir: PathBuf,
    /// Server port
    pub port: u16,
    /// Upload size limit for `/analyze`
    pub max_upload_bytes: usize,
}

const DEFAULT_MODEL_NAME: &str = "apollo2-2b";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Firestore,
        };

        Ok(Self {
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?,
            store_backend,
            model_endpoint: env::var("MODEL_ENDPOINT")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            model_name: env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL_NAME.to_string()),
            model_max_concurrency: parse_or("MODEL_MAX_CONCURRENCY", 1)?.max(1),
            frontend_url: env::var("FRONTEND_URL").ok().filter(|v| !v.is_empty()),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),
            port: parse_or("PORT", DEFAULT_PORT)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    /// Deterministic config for tests: in-memory store, no model.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: "althea-test".to_string(),
            store_backend: StoreBackend::Memory,
            model_endpoint: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_max_concurrency: 1,
            frontend_url: None,
            static_dir: PathBuf::from("static"),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
