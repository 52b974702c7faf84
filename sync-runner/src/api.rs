//! Sync runner HTTP API.
//!
//! Exposes three routes:
//! - `POST /api/run/:project` - send the JSON body through the project's adapter
//! - `GET /api/adapters` - list registered projects
//! - `GET /health` - liveness check

use crate::registry::AdapterRegistry;
use crate::runner::Runner;
use crate::types::RunResult;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Shared state for the runner API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub runner: Runner,
    pub registry: Arc<AdapterRegistry>,
}

impl ApiState {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            runner: Runner::new(Arc::clone(&registry)),
            registry,
        }
    }
}

/// Response for `GET /api/adapters`.
#[derive(Serialize)]
pub struct AdapterList {
    pub adapters: Vec<String>,
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

/// Always `200`; failures are reported inside the body.
async fn run_project(
    State(state): State<Arc<ApiState>>,
    Path(project): Path<String>,
    Json(data): Json<Value>,
) -> Json<RunResult> {
    debug!(project = %project, "Run requested");
    Json(state.runner.run(&project, &data).await)
}

async fn list_adapters(State(state): State<Arc<ApiState>>) -> Json<AdapterList> {
    Json(AdapterList {
        adapters: state.registry.projects(),
    })
}

async fn health() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/run/:project", post(run_project))
        .route("/api/adapters", get(list_adapters))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}
