use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for uscheck
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub firestore: FirestoreConfig,
    pub gemini: GeminiConfig,
    pub search: SearchConfig,
    pub qr: QrConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Client origin allowed by CORS when `allow_all_origins` is off
    pub allowed_origin: String,
    pub allow_all_origins: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            allowed_origin: "http://localhost:3000".into(),
            allow_all_origins: true,
        }
    }
}

/// Firestore connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    /// Google Cloud project. Empty means "take it from the credentials file".
    pub project_id: String,
    pub database_id: String,
    /// Path to a service-account or authorized-user JSON key
    pub credentials: PathBuf,
    /// `host:port` of a local Firestore emulator (no auth, plain HTTP)
    pub emulator_host: Option<String>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database_id: "(default)".into(),
            credentials: PathBuf::from("./credentials.json"),
            emulator_host: None,
        }
    }
}

/// Gemini text-generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key: literal value or "env:VAR_NAME" to read from environment
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: Some("env:GEMINI_API_KEY".into()),
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            temperature: 0.8,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 10000,
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    /// Resolve the API key, supporting "env:VAR_NAME" syntax
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.as_ref().and_then(|key| {
            if let Some(var_name) = key.strip_prefix("env:") {
                std::env::var(var_name).ok().filter(|v| !v.is_empty())
            } else if key.is_empty() {
                None
            } else {
                Some(key.clone())
            }
        })
    }
}

/// Recommendation behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cap on recommended spots per query
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 30 }
    }
}

/// QR pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    pub bucket: String,
    pub topic: String,
    /// Public URL prefix; the object name is appended
    pub public_base_url: String,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            bucket: "us-check-bucket".into(),
            topic: "qr-generate".into(),
            public_base_url: "https://storage.googleapis.com".into(),
        }
    }
}

impl QrConfig {
    /// Public URL of an object in the configured bucket
    pub fn public_url(&self, object: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            object
        )
    }
}

impl Config {
    /// Default config file looked up in the working directory
    pub const DEFAULT_FILE: &'static str = "uscheck.toml";

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Resolve the effective configuration: defaults, then the TOML file
    /// (explicit path or `uscheck.toml` if present), then the environment.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = Path::new(Self::DEFAULT_FILE);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides. The lookup is injected so tests don't
    /// have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SERVER_ADDRESS") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            match v.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!("Ignoring invalid PORT {:?}: {}", v, e),
            }
        }
        if let Some(v) = get("CLIENT_ADDRESS") {
            self.server.allowed_origin = v;
        }
        if let Some(v) = get("FIRESTORE_PROJECT_ID") {
            self.firestore.project_id = v;
        }
        if let Some(v) = get("FIRESTORE_DATABASE_ID") {
            self.firestore.database_id = v;
        }
        if let Some(v) = get("FIRESTORE_CREDENTIALS") {
            self.firestore.credentials = PathBuf::from(v);
        }
        if let Some(v) = get("FIRESTORE_EMULATOR_HOST") {
            self.firestore.emulator_host = Some(v);
        }
        if let Some(v) = get("QR_BUCKET") {
            self.qr.bucket = v;
        }
        if let Some(v) = get("QR_TOPIC") {
            self.qr.topic = v;
        }
    }
}
