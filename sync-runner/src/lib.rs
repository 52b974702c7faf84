//! Sync runner - adapters for external APIs and the runner that drives them.
//!
//! # Architecture
//!
//! ```text
//!   run(project, data)
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Runner                             │
//! │  - Resolve adapter by project name       │
//! │  - Normalize into {errors, response}     │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       AdapterRegistry                    │
//! │  - One instance per project              │
//! │  - Constructed lazily, kept for life     │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Adapter (implements ExternalApi)   │
//! │  - Token check / refresh on construction │
//! │  - send_data -> POST "post" endpoint     │
//! └─────────────────────────────────────────┘
//!          ↓
//!   External service
//! ```
//!
//! # Core Types
//!
//! - [`ExternalApi`] - Trait every adapter implements
//! - [`AdapterProfile`] - Defaults (host, endpoints, credential fields) for one service
//! - [`TokenApiAdapter`] - Adapter for services using credential-for-token exchange
//! - [`AdapterRegistry`] - Project name -> adapter instance
//! - [`Runner`] - The entry point: `run(project, data)`
//!
//! # Running a payload
//!
//! ```no_run
//! use std::sync::Arc;
//! use extsync::config::ErrorScope;
//! use extsync::SqliteSettingsStore;
//! use sync_runner::{AdapterRegistry, Runner};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = Arc::new(SqliteSettingsStore::new("settings.db", "<base64 key>")?);
//! let registry = Arc::new(AdapterRegistry::with_builtin(store, ErrorScope::Lifetime));
//! let runner = Runner::new(registry);
//!
//! let result = runner.run("example", &serde_json::json!({"visits": 3})).await;
//! if result.errors.is_empty() {
//!     println!("{}", result.response);
//! }
//! # Ok(())
//! # }
//! ```

mod adapter;
mod types;
pub mod adapters;
pub mod api;
pub mod registry;
pub mod runner;

pub use adapter::{is_blank, ExternalApi};
pub use adapters::token_api::{Connected, TokenApiAdapter};
pub use registry::{AdapterFactory, AdapterRegistry, ProfileFactory, SharedAdapter};
pub use runner::Runner;
pub use types::{
    AdapterProfile, AuthState, ErrorLog, RunResult, CODE_ERROR, CONNECTION_ERROR,
    CONNECTION_POST_ERROR,
};
