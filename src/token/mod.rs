//! Token lifecycle: validity, credential exchange, persistence.
//!
//! A token is the triple (value, issued-at, type). It is valid for
//! [`TOKEN_EXPIRATION_SECS`] after issue, and the three fields always change
//! together: a successful exchange sets all of them, a failed one clears all
//! of them. Every change is written back to the adapter's settings record.

use crate::dispatch::{Headers, HttpDispatcher};
use crate::error::{SyncError, SyncResult};
use crate::settings::{millis_from_value, SettingsRecord, SettingsStore};
use anyhow::Result;
use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifetime of an issued token, in seconds.
pub const TOKEN_EXPIRATION_SECS: i64 = 900;

/// Endpoint key used for the credential exchange.
pub const AUTH_ENDPOINT: &str = "auth";

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// An access token as issued by the external service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    /// Issue time, epoch milliseconds
    pub issued_at: Option<i64>,
    pub token_type: String,
}

impl Token {
    /// Reads the token fields of a settings record.
    pub fn from_record(record: &SettingsRecord) -> Self {
        Self {
            value: record.token.clone().unwrap_or_default(),
            issued_at: record.token_issued,
            token_type: record.token_type.clone().unwrap_or_default(),
        }
    }

    /// Parses a successful exchange response.
    ///
    /// Returns `None` unless `access_token`, `issued_at` and `token_type` are
    /// all present and non-empty.
    pub fn from_auth_response(response: &Value) -> Option<Self> {
        let value = non_empty_text(response.get("access_token")?)?;
        let issued_at = millis_from_value(response.get("issued_at")?).filter(|ms| *ms != 0)?;
        let token_type = non_empty_text(response.get("token_type")?)?;
        Some(Self {
            value,
            issued_at: Some(issued_at),
            token_type,
        })
    }

    /// True when a token value is held, whether or not it has expired.
    pub fn is_present(&self) -> bool {
        !self.value.is_empty()
    }

    /// True iff every field is set and `now_ms - issued_at` is below the
    /// expiration window.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        if self.value.is_empty() || self.token_type.is_empty() {
            return false;
        }
        match self.issued_at {
            Some(issued_at) if issued_at != 0 => {
                now_ms - issued_at < TOKEN_EXPIRATION_SECS * 1000
            }
            _ => false,
        }
    }

    /// `"<type> <value>"`, the authorization header value.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.value)
    }

    fn write_into(&self, record: &mut SettingsRecord) {
        record.token = Some(self.value.clone());
        record.token_issued = self.issued_at;
        record.token_type = Some(self.token_type.clone());
    }
}

fn non_empty_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty() && text != "0").then_some(text)
}

/// Owns an adapter's token and keeps its settings record in step with it.
pub struct TokenManager {
    settings_name: String,
    /// Effective settings without token fields; written as a whole when the
    /// store has no record yet.
    base: SettingsRecord,
    token: Token,
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    /// Creates a manager seeded with the token fields of `settings`.
    pub fn new(
        settings_name: impl Into<String>,
        settings: &SettingsRecord,
        store: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let base = SettingsRecord {
            token: None,
            token_issued: None,
            token_type: None,
            ..settings.clone()
        };
        Self {
            settings_name: settings_name.into(),
            base,
            token: Token::from_record(settings),
            store,
            clock,
        }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn settings_name(&self) -> &str {
        &self.settings_name
    }

    /// Whether the cached token can be used right now.
    pub fn is_valid(&self) -> bool {
        self.token.is_valid_at(self.clock.now_millis())
    }

    /// Adds `authorization: "<type> <token>"` when a token is held.
    pub fn decorate_headers(&self, mut headers: Headers) -> Headers {
        if self.token.is_present() {
            headers.insert("authorization".to_string(), self.token.authorization());
        }
        headers
    }

    /// Exchanges the stored credentials for a new token.
    ///
    /// On success the token is stored and persisted. On failure the token is
    /// cleared, the cleared state is persisted, and `SyncError::Auth` carries
    /// the raw response body (or the dispatch failure message).
    pub async fn refresh(&mut self, dispatcher: &HttpDispatcher) -> SyncResult<()> {
        info!(settings = %self.settings_name, "Requesting access token");

        let headers = self.decorate_headers(Headers::new());
        let credentials = Value::Object(self.base.auth_credentials.clone());
        let body = match dispatcher
            .send(AUTH_ENDPOINT, &credentials, &[], &headers, Method::POST)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                self.drop_token();
                return Err(SyncError::Auth(e.to_string()));
            }
        };

        let issued = serde_json::from_str::<Value>(&body)
            .ok()
            .as_ref()
            .and_then(Token::from_auth_response);

        match issued {
            Some(token) => {
                self.save_token(token);
                info!(settings = %self.settings_name, "Access token issued");
                Ok(())
            }
            None => {
                self.drop_token();
                Err(SyncError::Auth(body))
            }
        }
    }

    fn save_token(&mut self, token: Token) {
        self.token = token;
        if let Err(e) = self.persist(true) {
            warn!(settings = %self.settings_name, error = %e, "Failed to persist issued token");
        }
    }

    fn drop_token(&mut self) {
        self.token = Token::default();
        if let Err(e) = self.persist(false) {
            warn!(settings = %self.settings_name, error = %e, "Failed to persist cleared token");
        }
    }

    /// Writes the current token into the stored record. A cleared token is
    /// stored as empty strings with no issue time.
    ///
    /// A missing record is created only when a token is being saved.
    fn persist(&self, create_missing: bool) -> Result<()> {
        match self.store.get_by_name(&self.settings_name)? {
            Some(mut record) => {
                self.token.write_into(&mut record);
                self.store.set_by_name(&self.settings_name, &record)
            }
            None if create_missing => {
                let mut record = self.base.clone();
                self.token.write_into(&mut record);
                self.store
                    .add(&self.settings_name, &record, &self.settings_name)
            }
            None => {
                debug!(settings = %self.settings_name, "No stored settings, nothing to clear");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests;
