//! Adapter for services that trade stored credentials for a bearer-style
//! token on an `auth` endpoint and accept payloads on a `post` endpoint.

use crate::adapter::{is_blank, ExternalApi};
use crate::types::{AdapterProfile, AuthState, ErrorLog};
use async_trait::async_trait;
use extsync::config::ErrorScope;
use extsync::{Clock, Headers, HttpDispatcher, SettingsStore, SyncResult, TokenManager};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Endpoint key payloads are posted to.
pub const POST_ENDPOINT: &str = "post";

/// Result of constructing an adapter.
///
/// Construction does not fail on authentication: `init_errors` holds what
/// went wrong, and the adapter stays unauthenticated.
pub struct Connected {
    pub adapter: TokenApiAdapter,
    pub init_errors: Vec<String>,
}

/// Token-exchange adapter.
///
/// # States
/// - `Unauthenticated` - no usable token; initial state
/// - `Authenticated` - a valid token is held
///
/// The only way back to `Unauthenticated` is a failed credential exchange.
pub struct TokenApiAdapter {
    name: String,
    dispatcher: HttpDispatcher,
    tokens: TokenManager,
    errors: ErrorLog,
    state: AuthState,
    scope: ErrorScope,
}

impl TokenApiAdapter {
    /// Loads settings, then authenticates unless a valid token is cached.
    ///
    /// Only a broken settings store or HTTP client setup returns `Err`.
    pub async fn connect(
        profile: &AdapterProfile,
        store: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        scope: ErrorScope,
    ) -> SyncResult<Connected> {
        let settings_name = profile.settings_name();
        let stored = store.get_by_name(&settings_name)?;
        if stored.is_none() {
            debug!(settings = %settings_name, "No stored settings, using profile defaults");
        }
        let settings = profile.overlay(stored.as_ref());

        let dispatcher = HttpDispatcher::new(settings.host.clone(), settings.endpoints.clone())?;
        let tokens = TokenManager::new(settings_name, &settings, store, clock);

        let mut adapter = Self {
            name: profile.adapter_name(),
            dispatcher,
            tokens,
            errors: ErrorLog::default(),
            state: AuthState::Unauthenticated,
            scope,
        };

        if adapter.tokens.is_valid() {
            debug!(adapter = %adapter.name, "Cached token is valid");
            adapter.state = AuthState::Authenticated;
        } else {
            adapter.authenticate().await;
        }

        let init_errors = adapter.errors.entries().to_vec();
        Ok(Connected {
            adapter,
            init_errors,
        })
    }

    pub fn auth_state(&self) -> AuthState {
        self.state
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    /// Runs the credential exchange; failures go to the error log.
    async fn authenticate(&mut self) -> bool {
        match self.tokens.refresh(&self.dispatcher).await {
            Ok(()) => {
                self.state = AuthState::Authenticated;
                true
            }
            Err(e) => {
                warn!(adapter = %self.name, error = %e, "Authentication failed");
                self.state = AuthState::Unauthenticated;
                self.errors.push(e.to_string());
                false
            }
        }
    }

    /// Re-authenticates when the cached token has expired.
    async fn ensure_token(&mut self) -> bool {
        if self.tokens.is_valid() {
            return true;
        }
        info!(adapter = %self.name, "Token expired, re-authenticating");
        self.authenticate().await
    }
}

#[async_trait]
impl ExternalApi for TokenApiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn errors(&self) -> &[String] {
        self.errors.entries()
    }

    async fn begin_call(&mut self) {
        if self.scope == ErrorScope::PerCall {
            self.errors.clear();
            self.ensure_token().await;
        }
    }

    async fn send_data(&mut self, payload: &Value) -> Option<Value> {
        if is_blank(payload) {
            debug!(adapter = %self.name, "Blank payload, nothing to send");
            return None;
        }

        if !self.ensure_token().await {
            return None;
        }

        let headers = self.tokens.decorate_headers(Headers::new());
        let body = match self
            .dispatcher
            .send(POST_ENDPOINT, payload, &[], &headers, Method::POST)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(adapter = %self.name, error = %e, "Failed to send data");
                self.errors.push(e.to_string());
                return None;
            }
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Null) => {
                debug!(adapter = %self.name, "Response is null");
                self.errors.push("Empty response");
                None
            }
            Ok(response) => Some(response),
            Err(e) => {
                debug!(adapter = %self.name, error = %e, "Response is not JSON");
                self.errors.push(format!("Invalid JSON response: {}", e));
                None
            }
        }
    }
}
