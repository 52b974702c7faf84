//! Persisted settings for external API adapters.
//!
//! One record per adapter, stored under `"<project>_api_settings"`. The
//! record is a JSON object with the keys `host`, `auth_credentials`,
//! `endpoints`, `token`, `token_issued` and `token_type`.
//!
//! # Usage
//!
//! ```no_run
//! use extsync::settings::{settings_name, SettingsRecord, SettingsStore, SqliteSettingsStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let encryption_key = std::env::var("EXTSYNC_ENCRYPTION_KEY")?;
//! let store = SqliteSettingsStore::new("settings.db", &encryption_key)?;
//!
//! let name = settings_name("example");
//! let record = SettingsRecord {
//!     host: "https://svc".to_string(),
//!     ..Default::default()
//! };
//! store.add(&name, &record, &name)?;
//!
//! if let Some(stored) = store.get_by_name(&name)? {
//!     println!("Host: {}", stored.host);
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

mod encryption;
mod storage;

pub use encryption::{Sealed, SettingsCipher};
pub use storage::SqliteSettingsStore;

/// Suffix appended to a project name to form its adapter name.
pub const ADAPTER_SUFFIX: &str = "_api";

/// Suffix appended to an adapter name to form its settings name.
pub const SETTINGS_SUFFIX: &str = "_settings";

/// Adapter name for a project (`"example"` -> `"example_api"`).
pub fn adapter_name(project: &str) -> String {
    format!("{}{}", project, ADAPTER_SUFFIX)
}

/// Settings name for a project (`"example"` -> `"example_api_settings"`).
pub fn settings_name(project: &str) -> String {
    format!("{}{}", adapter_name(project), SETTINGS_SUFFIX)
}

/// Configuration, credentials and token state for one adapter.
///
/// Deserialization is lenient about the shapes older writers produced:
/// an empty list stands for an empty mapping, and `token_issued` may be a
/// number, a numeric string, or an empty string.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    /// Base URL of the external service
    #[serde(default)]
    pub host: String,

    /// Named credential fields sent as the auth request body
    #[serde(default, deserialize_with = "object_or_empty")]
    pub auth_credentials: Map<String, Value>,

    /// Endpoint key -> path (e.g. `"auth"` -> `"/oauth/token"`)
    #[serde(default, deserialize_with = "endpoint_map")]
    pub endpoints: BTreeMap<String, String>,

    /// Cached access token
    #[serde(default)]
    pub token: Option<String>,

    /// Token issue time, epoch milliseconds
    #[serde(default, deserialize_with = "lenient_millis")]
    pub token_issued: Option<i64>,

    /// Token type used as the authorization scheme (e.g. `"Bearer"`)
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Durable key-value store for settings records.
pub trait SettingsStore: Send + Sync {
    /// Returns the record stored under `name`, if any.
    fn get_by_name(&self, name: &str) -> Result<Option<SettingsRecord>>;

    /// Writes `record` under `name`, replacing any existing value.
    fn set_by_name(&self, name: &str, record: &SettingsRecord) -> Result<()>;

    /// Creates a new record. Fails if `name` already exists.
    fn add(&self, name: &str, record: &SettingsRecord, label: &str) -> Result<()>;
}

/// Adds a record for every project that has none yet.
///
/// Existing records are left untouched so cached tokens survive restarts.
/// Returns the number of records created.
pub fn seed<'a, I>(store: &dyn SettingsStore, seeds: I) -> Result<usize>
where
    I: IntoIterator<Item = (&'a str, SettingsRecord)>,
{
    let mut created = 0;
    for (project, record) in seeds {
        let name = settings_name(project);
        if store.get_by_name(&name)?.is_some() {
            tracing::debug!(settings = %name, "Settings already present, skipping seed");
            continue;
        }
        store.add(&name, &record, &name)?;
        tracing::info!(settings = %name, "Seeded adapter settings");
        created += 1;
    }
    Ok(created)
}

/// Reads epoch milliseconds from a JSON number or numeric string.
///
/// Empty strings, `null` and anything unparsable read as `None`.
pub fn millis_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

fn lenient_millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(millis_from_value))
}

fn object_or_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn endpoint_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = object_or_empty(deserializer)?;
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(path) => Some((key, path)),
            _ => None,
        })
        .collect())
}
