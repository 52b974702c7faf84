use crate::settings::SettingsRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Complete extsync configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtsyncConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-project settings seeds, keyed by project name
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterSeed>,
}

/// Settings store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "settings.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_port() -> u16 {
    3002
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

/// How long entries stay in an adapter's error log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// Errors accumulate for the adapter's whole lifetime; once anything has
    /// failed, every later run reports the first error.
    #[default]
    Lifetime,
    /// The log is cleared at the start of every run.
    PerCall,
}

/// Runner configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub error_scope: ErrorScope,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "sync_runner=info,extsync=info,api=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Initial settings for one project, written only if none are stored yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdapterSeed {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
    #[serde(default)]
    pub auth_credentials: Map<String, Value>,
    /// Credential fields the adapter reads from stored settings.
    /// Empty means every stored credential is used.
    #[serde(default)]
    pub credential_fields: Vec<String>,
}

impl AdapterSeed {
    /// The settings record this seed writes (no token).
    pub fn to_record(&self) -> SettingsRecord {
        SettingsRecord {
            host: self.host.clone(),
            auth_credentials: self.auth_credentials.clone(),
            endpoints: self.endpoints.clone(),
            ..Default::default()
        }
    }
}

impl ExtsyncConfig {
    /// Applies `EXTSYNC_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("EXTSYNC_SETTINGS_DB") {
            self.store.path = path;
        }
        if let Ok(port) = std::env::var("EXTSYNC_API_PORT") {
            self.api.port = port
                .parse()
                .context("EXTSYNC_API_PORT must be a valid port number")?;
        }
        if let Ok(scope) = std::env::var("EXTSYNC_ERROR_SCOPE") {
            self.runner.error_scope = match scope.as_str() {
                "lifetime" => ErrorScope::Lifetime,
                "per_call" => ErrorScope::PerCall,
                other => anyhow::bail!(
                    "EXTSYNC_ERROR_SCOPE must be 'lifetime' or 'per_call', got '{}'",
                    other
                ),
            };
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExtsyncConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ExtsyncConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Loads `path` if it exists, otherwise defaults, then applies env overrides.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<ExtsyncConfig> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        ExtsyncConfig::default()
    };
    config.apply_env()?;
    Ok(config)
}
