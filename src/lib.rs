//! extsync - token-authenticated plumbing for external HTTP APIs.
//!
//! An external service is reached through three pieces:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       TokenManager                       │
//! │  - Validity check (900 s window)         │
//! │  - Credential exchange on the auth route │
//! │  - Persists every token change           │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       HttpDispatcher                     │
//! │  - host + endpoint map                   │
//! │  - JSON body, fixed 60 s timeout         │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SettingsStore                      │
//! │  - host, credentials, endpoints, token   │
//! │  - SQLite, encrypted at rest             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Adapters, the adapter registry and the runner that ties them together live
//! in the `sync-runner` crate.

// Runtime configuration (TOML + env)
pub mod config;

// Request building and sending
pub mod dispatch;

// Domain error type
pub mod error;

// Settings records and their storage
pub mod settings;

// Token lifecycle
pub mod token;

pub use dispatch::{Headers, HttpDispatcher};
pub use error::{SyncError, SyncResult};
pub use settings::{SettingsRecord, SettingsStore, SqliteSettingsStore};
pub use token::{Clock, SystemClock, Token, TokenManager};
