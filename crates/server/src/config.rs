//! # Application Configuration
//!
//! This module defines the configuration structure for the `hslookup-server` and
//! provides the logic for loading it from a `config.yml` file and environment
//! variables.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use hslookup::constants::{DEFAULT_DB_FILE, DEFAULT_UPLOAD_DIR};
use hslookup::providers::ai::openai::{DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS};
use hslookup::{CatalogSource, IntentClassifier, QueryBackendKind};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
    /// Indicates a value that parsed but cannot be used.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite mirror of the catalog. Loaded from `DB_URL` env var.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Where uploaded images are written, one sub-directory per session.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Which executor runs generated queries (`tabular` or `sql`).
    #[serde(default)]
    pub query_backend: QueryBackendKind,
    /// How lookup requests are detected (`substring` or `word`).
    #[serde(default)]
    pub classifier: IntentClassifier,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

/// Provides a default value for the `port` field if not set in the environment.
fn default_port() -> u16 {
    9090
}
/// Provides a default value for the `db_url` field if not set in the environment.
fn default_db_url() -> String {
    DEFAULT_DB_FILE.to_string()
}

fn default_upload_dir() -> String {
    DEFAULT_UPLOAD_DIR.to_string()
}

/// The kind of catalog source named by `catalog.source`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSourceKind {
    Sheet,
    Csv,
    #[default]
    Seed,
}

/// Where the product catalog is loaded from at startup.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub source: CatalogSourceKind,
    /// The Google Sheet URL, for `source: sheet`.
    #[serde(default)]
    pub url: Option<String>,
    /// The worksheet tab id, for `source: sheet`.
    #[serde(default)]
    pub gid: Option<String>,
    /// The CSV file path, for `source: csv`.
    #[serde(default)]
    pub path: Option<String>,
}

impl CatalogConfig {
    /// Resolves the flat configuration into a `CatalogSource`, checking that the
    /// fields the chosen source needs are present.
    pub fn source(&self) -> Result<CatalogSource, ConfigError> {
        let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        match self.source {
            CatalogSourceKind::Seed => Ok(CatalogSource::Seed),
            CatalogSourceKind::Sheet => {
                let url = non_blank(&self.url).ok_or_else(|| {
                    ConfigError::Invalid("catalog.url is required for a sheet source".to_string())
                })?;
                Ok(CatalogSource::Sheet {
                    url,
                    gid: non_blank(&self.gid),
                })
            }
            CatalogSourceKind::Csv => {
                let path = non_blank(&self.path).ok_or_else(|| {
                    ConfigError::Invalid("catalog.path is required for a csv source".to_string())
                })?;
                Ok(CatalogSource::Csv { path })
            }
        }
    }
}

/// Settings for the OpenAI-compatible completion endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub api_url: String,
    /// Usually `${OPENAI_API_KEY}` in `config.yml`; a blank key is rejected at startup.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: default_completion_url(),
            api_key: None,
            model_name: default_model_name(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_completion_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model_name() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    1
}

/// Limits on the in-memory conversation store.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Sessions kept at once; the least recently used one is dropped to make room.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Seconds without a submission after which a session is forgotten.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

fn default_max_sessions() -> usize {
    1000
}

fn default_idle_timeout_secs() -> u64 {
    60 * 60
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(format!("Invalid substitution pattern: {e}")))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// - An explicit `config_path_override` must exist. Without one, `config.yml` next to
///   this crate is used when present, and the built-in defaults otherwise.
/// - `${VAR}` placeholders in the file are replaced from the environment.
/// - Top-level keys like `port` and `db_url` are overridden by `PORT` and `DB_URL`.
/// - Nested keys are overridden by `HSLOOKUP_...` variables (e.g., `HSLOOKUP_COMPLETION__API_KEY`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder();

    let main_content = match config_path_override {
        Some(override_path) => Some(read_and_substitute(override_path)?.ok_or_else(|| {
            ConfigError::NotFound(format!("Config file not found at '{override_path}'."))
        })?),
        None => {
            let user_config_path = format!("{base_path}/config.yml");
            let content = read_and_substitute(&user_config_path)?;
            if content.is_some() {
                info!("Loading user-defined configuration from '{user_config_path}'.");
            } else {
                info!("'{user_config_path}' not found. Using built-in defaults.");
            }
            content
        }
    };
    if let Some(content) = main_content {
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        // Load environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Load prefixed environment variables for deeper overrides.
        .add_source(
            Environment::with_prefix("HSLOOKUP")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    // The catalog section must name a usable source.
    config.catalog.source()?;
    if config.sessions.max_sessions == 0 {
        return Err(ConfigError::Invalid(
            "sessions.max_sessions must be at least 1".to_string(),
        ));
    }

    Ok(config)
}
