//! Runner - resolves an adapter and turns its outcome into a [`RunResult`].

use crate::adapter::is_blank;
use crate::registry::AdapterRegistry;
use crate::types::{RunResult, CODE_ERROR, CONNECTION_ERROR, CONNECTION_POST_ERROR};
use extsync::settings::adapter_name;
use extsync::SyncError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct Runner {
    registry: Arc<AdapterRegistry>,
}

impl Runner {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Sends `data` through the adapter for `project`.
    ///
    /// Never fails: every problem ends up in `errors`, keyed by kind.
    /// `response` is `{}` unless the send produced a non-blank response.
    pub async fn run(&self, project: &str, data: &Value) -> RunResult {
        let adapter = match self.registry.get_instance(project).await {
            Ok(adapter) => adapter,
            Err(SyncError::UnknownAdapter(_)) => {
                let message = format!("External API class not found: {}", adapter_name(project));
                info!(target: "api", project = %project, "Sync error. {}", message);
                return RunResult::failed(CODE_ERROR, message);
            }
            Err(e) => {
                info!(target: "api", project = %project, "Sync error. {}", e);
                return RunResult::failed(CONNECTION_ERROR, e.to_string());
            }
        };

        let mut adapter = adapter.lock().await;
        adapter.begin_call().await;

        if let Some(first) = adapter.errors().first() {
            info!(target: "api", adapter = %adapter.name(), "Sync error. {}", first);
            return RunResult::failed(CONNECTION_ERROR, first.clone());
        }

        match adapter.send_data(data).await {
            Some(response) if !is_blank(&response) => {
                debug!(adapter = %adapter.name(), "Sync succeeded");
                RunResult {
                    response,
                    ..Default::default()
                }
            }
            _ => {
                let errors = serde_json::to_string(adapter.errors())
                    .unwrap_or_else(|_| "[]".to_string());
                info!(target: "api", adapter = %adapter.name(), "Sync error. {}", errors);
                RunResult::failed(CONNECTION_POST_ERROR, errors)
            }
        }
    }
}
