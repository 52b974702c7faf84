use extsync::settings::{adapter_name, settings_name, SettingsRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Error-map key used when no adapter matches the project.
pub const CODE_ERROR: &str = "Code error";

/// Error-map key used when the adapter already carries errors.
pub const CONNECTION_ERROR: &str = "Connection error";

/// Error-map key used when sending produced no response.
pub const CONNECTION_POST_ERROR: &str = "Connection post error";

/// Built-in defaults for one external service.
///
/// Stored settings are laid over these defaults when the adapter is
/// constructed; see [`AdapterProfile::overlay`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdapterProfile {
    /// Project identifier the runner resolves (e.g. `"example"`)
    pub project: String,

    /// Host used when settings do not name one
    pub default_host: String,

    /// Endpoint map used when settings do not override a key
    pub default_endpoints: BTreeMap<String, String>,

    /// Credential fields read from settings. Empty means all of them.
    pub credential_fields: Vec<String>,
}

impl AdapterProfile {
    /// Profile with no defaults; everything comes from settings.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Default::default()
        }
    }

    /// `"<project>_api"`
    pub fn adapter_name(&self) -> String {
        adapter_name(&self.project)
    }

    /// `"<project>_api_settings"`
    pub fn settings_name(&self) -> String {
        settings_name(&self.project)
    }

    /// Effective settings: profile defaults with stored values laid over.
    ///
    /// - a non-empty stored host replaces the default host
    /// - stored endpoints are merged over the default endpoints
    /// - stored credentials fill the declared credential fields (every
    ///   stored credential when none are declared); empty values are skipped
    /// - token fields are taken from the stored record as-is
    pub fn overlay(&self, stored: Option<&SettingsRecord>) -> SettingsRecord {
        let mut effective = SettingsRecord {
            host: self.default_host.clone(),
            endpoints: self.default_endpoints.clone(),
            auth_credentials: self
                .credential_fields
                .iter()
                .map(|field| (field.clone(), Value::String(String::new())))
                .collect(),
            ..Default::default()
        };

        let Some(stored) = stored else {
            return effective;
        };

        if !stored.host.is_empty() {
            effective.host = stored.host.clone();
        }

        for (key, path) in &stored.endpoints {
            effective.endpoints.insert(key.clone(), path.clone());
        }

        let credentials: Map<String, Value> = stored
            .auth_credentials
            .iter()
            .filter(|(field, value)| {
                (self.credential_fields.is_empty() || self.credential_fields.contains(field))
                    && !is_empty_setting(value)
            })
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        effective.auth_credentials.extend(credentials);

        effective.token = stored.token.clone();
        effective.token_issued = stored.token_issued;
        effective.token_type = stored.token_type.clone();
        effective
    }
}

fn is_empty_setting(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Authentication state of an adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Ordered, append-only list of failure messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<String>,
}

impl ErrorLog {
    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push(message.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn first(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The log as a JSON array string, e.g. `["timeout"]`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Outcome of one runner call. Both fields are always present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Human-readable error kind -> message; empty on success
    pub errors: BTreeMap<String, String>,

    /// Decoded response of the external API; `{}` when there is none
    pub response: Value,
}

impl Default for RunResult {
    fn default() -> Self {
        Self {
            errors: BTreeMap::new(),
            response: Value::Object(Map::new()),
        }
    }
}

impl RunResult {
    /// A result carrying a single error and an empty response.
    pub fn failed(kind: &str, message: impl Into<String>) -> Self {
        let mut result = Self::default();
        result.errors.insert(kind.to_string(), message.into());
        result
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile() -> AdapterProfile {
        AdapterProfile {
            project: "example".to_string(),
            default_host: "https://example.com".to_string(),
            default_endpoints: BTreeMap::from([("auth".to_string(), "/oauth/token".to_string())]),
            credential_fields: vec!["client_id".to_string(), "client_secret".to_string()],
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(profile().adapter_name(), "example_api");
        assert_eq!(profile().settings_name(), "example_api_settings");
    }

    #[test]
    fn test_overlay_without_stored_settings() {
        let effective = profile().overlay(None);
        assert_eq!(effective.host, "https://example.com");
        assert_eq!(effective.endpoints["auth"], "/oauth/token");
        assert_eq!(effective.auth_credentials["client_id"], "");
        assert!(effective.token.is_none());
    }

    #[test]
    fn test_overlay_merges_stored_settings() {
        let mut stored = SettingsRecord {
            host: "https://svc".to_string(),
            endpoints: BTreeMap::from([("post".to_string(), "/p".to_string())]),
            token: Some("abc".to_string()),
            token_issued: Some(1000),
            token_type: Some("Bearer".to_string()),
            ..Default::default()
        };
        stored.auth_credentials.insert("client_id".to_string(), json!("id-1"));
        stored.auth_credentials.insert("client_secret".to_string(), json!(""));
        stored.auth_credentials.insert("undeclared".to_string(), json!("x"));

        let effective = profile().overlay(Some(&stored));
        assert_eq!(effective.host, "https://svc");
        assert_eq!(effective.endpoints["auth"], "/oauth/token");
        assert_eq!(effective.endpoints["post"], "/p");
        assert_eq!(effective.auth_credentials["client_id"], "id-1");
        // Empty stored value keeps the default; undeclared fields are ignored.
        assert_eq!(effective.auth_credentials["client_secret"], "");
        assert!(!effective.auth_credentials.contains_key("undeclared"));
        assert_eq!(effective.token.as_deref(), Some("abc"));
        assert_eq!(effective.token_issued, Some(1000));
    }

    #[test]
    fn test_overlay_empty_host_keeps_default() {
        let stored = SettingsRecord::default();
        assert_eq!(profile().overlay(Some(&stored)).host, "https://example.com");
    }

    #[test]
    fn test_overlay_takes_all_credentials_when_none_declared() {
        let mut stored = SettingsRecord::default();
        stored.auth_credentials.insert("user".to_string(), json!("u"));
        stored.auth_credentials.insert("pass".to_string(), json!("p"));

        let effective = AdapterProfile::new("open").overlay(Some(&stored));
        assert_eq!(effective.auth_credentials.len(), 2);
        assert_eq!(effective.auth_credentials["pass"], "p");
    }

    #[test]
    fn test_error_log() {
        let mut log = ErrorLog::default();
        assert!(log.is_empty());
        assert_eq!(log.to_json(), "[]");

        log.push("first");
        log.push("second");
        assert_eq!(log.first(), Some("first"));
        assert_eq!(log.to_json(), r#"["first","second"]"#);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_run_result_serialization() {
        let result = RunResult::failed(CODE_ERROR, "External API class not found: x_api");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            json!({"errors": {"Code error": "External API class not found: x_api"}, "response": {}})
        );
        assert!(!result.is_ok());
        assert!(RunResult::default().is_ok());
    }
}
