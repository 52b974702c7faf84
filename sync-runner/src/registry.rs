//! Adapter registry - project name to adapter instance.
//!
//! Factories are registered up front; instances are built on first use and
//! kept until the registry is dropped.

use crate::adapter::ExternalApi;
use crate::adapters::builtin_profiles;
use crate::adapters::token_api::TokenApiAdapter;
use crate::types::AdapterProfile;
use async_trait::async_trait;
use extsync::config::{ErrorScope, ExtsyncConfig};
use extsync::{Clock, SettingsStore, SyncError, SyncResult, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// One adapter instance, shared by every run for its project.
pub type SharedAdapter = Arc<Mutex<Box<dyn ExternalApi>>>;

/// Builds the adapter for one project.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn build(&self, store: Arc<dyn SettingsStore>) -> SyncResult<Box<dyn ExternalApi>>;
}

/// Factory for [`TokenApiAdapter`]s described by an [`AdapterProfile`].
pub struct ProfileFactory {
    profile: AdapterProfile,
    clock: Arc<dyn Clock>,
    scope: ErrorScope,
}

impl ProfileFactory {
    pub fn new(profile: AdapterProfile, scope: ErrorScope) -> Self {
        Self::with_clock(profile, Arc::new(SystemClock), scope)
    }

    pub fn with_clock(profile: AdapterProfile, clock: Arc<dyn Clock>, scope: ErrorScope) -> Self {
        Self {
            profile,
            clock,
            scope,
        }
    }
}

#[async_trait]
impl AdapterFactory for ProfileFactory {
    async fn build(&self, store: Arc<dyn SettingsStore>) -> SyncResult<Box<dyn ExternalApi>> {
        let connected =
            TokenApiAdapter::connect(&self.profile, store, Arc::clone(&self.clock), self.scope)
                .await?;
        if !connected.init_errors.is_empty() {
            warn!(
                adapter = %self.profile.adapter_name(),
                errors = connected.init_errors.len(),
                "Adapter constructed with errors"
            );
        }
        Ok(Box::new(connected.adapter))
    }
}

pub struct AdapterRegistry {
    store: Arc<dyn SettingsStore>,
    factories: HashMap<String, Arc<dyn AdapterFactory>>,
    instances: Mutex<HashMap<String, Arc<OnceCell<SharedAdapter>>>>,
}

impl AdapterRegistry {
    /// Empty registry; nothing resolves until factories are registered.
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            factories: HashMap::new(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Registry with every built-in adapter.
    pub fn with_builtin(store: Arc<dyn SettingsStore>, scope: ErrorScope) -> Self {
        let mut registry = Self::new(store);
        for profile in builtin_profiles() {
            let project = profile.project.clone();
            registry.register(project, Arc::new(ProfileFactory::new(profile, scope)));
        }
        registry
    }

    /// Built-in adapters plus a generic token adapter for every project
    /// that appears only in the config file.
    pub fn from_config(store: Arc<dyn SettingsStore>, config: &ExtsyncConfig) -> Self {
        let scope = config.runner.error_scope;
        let mut registry = Self::with_builtin(store, scope);
        for (project, seed) in &config.adapters {
            if registry.factories.contains_key(project) {
                continue;
            }
            let profile = AdapterProfile {
                credential_fields: seed.credential_fields.clone(),
                ..AdapterProfile::new(project.as_str())
            };
            info!(project = %project, "Registering config-defined adapter");
            registry.register(project.clone(), Arc::new(ProfileFactory::new(profile, scope)));
        }
        registry
    }

    /// Registers (or replaces) the factory for `project`.
    pub fn register(&mut self, project: impl Into<String>, factory: Arc<dyn AdapterFactory>) {
        self.factories.insert(project.into(), factory);
    }

    /// Registered project names, sorted.
    pub fn projects(&self) -> Vec<String> {
        let mut projects: Vec<String> = self.factories.keys().cloned().collect();
        projects.sort();
        projects
    }

    /// The adapter for `project`, built on first use.
    ///
    /// Each project has its own cell: concurrent first calls for one project
    /// build it once, while other projects resolve without waiting. A failed
    /// build leaves the cell empty so the next call retries.
    pub async fn get_instance(&self, project: &str) -> SyncResult<SharedAdapter> {
        let factory = self
            .factories
            .get(project)
            .ok_or_else(|| SyncError::UnknownAdapter(project.to_string()))?;

        let cell = {
            let mut instances = self.instances.lock().await;
            Arc::clone(instances.entry(project.to_string()).or_default())
        };

        let shared = cell
            .get_or_try_init(|| async {
                debug!(project = %project, "Constructing adapter");
                let adapter = factory.build(Arc::clone(&self.store)).await?;
                Ok::<SharedAdapter, SyncError>(Arc::new(Mutex::new(adapter)))
            })
            .await?;
        Ok(Arc::clone(shared))
    }
}
