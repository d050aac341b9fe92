//! Connection Resolver
//!
//! Maps logical database names to open [`DatabaseService`] handles. The
//! resolver is built once at setup time (from [`StoreConfig`] or by explicit
//! registration) and passed to everything that needs a handle; nothing looks
//! databases up from global state.

use crate::config::StoreConfig;
use crate::db::DatabaseService;
use crate::models::ModelDescriptor;
use crate::services::PageStoreError;
use std::collections::BTreeMap;

/// Registry of named database handles
#[derive(Debug, Clone, Default)]
pub struct ConnectionResolver {
    handles: BTreeMap<String, DatabaseService>,
}

impl ConnectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every database listed in the configuration
    pub async fn from_config(config: &StoreConfig) -> Result<Self, PageStoreError> {
        let mut resolver = Self::new();
        for (name, database) in &config.database {
            let handle =
                DatabaseService::with_busy_timeout(database.path.clone(), database.busy_timeout())
                    .await?;
            resolver.register(name.clone(), handle);
        }
        Ok(resolver)
    }

    /// Register (or replace) the handle for a logical name
    pub fn register(&mut self, name: impl Into<String>, handle: DatabaseService) {
        let name = name.into();
        tracing::debug!("Registered database '{}' at {}", name, handle.path().display());
        self.handles.insert(name, handle);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, name: impl Into<String>, handle: DatabaseService) -> Self {
        self.register(name, handle);
        self
    }

    /// Registered logical names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    /// Resolve a logical database name
    ///
    /// # Errors
    ///
    /// `Configuration` when nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<DatabaseService, PageStoreError> {
        self.handles.get(name).cloned().ok_or_else(|| {
            PageStoreError::configuration(format!(
                "A database connection must be set with the key 'database.{}' in the config",
                name
            ))
        })
    }

    /// Resolve the database a node kind declares
    ///
    /// # Errors
    ///
    /// `Configuration` when the kind declares no database name, or when the
    /// declared name is not registered.
    pub fn resolve_for_model(
        &self,
        descriptor: &ModelDescriptor,
    ) -> Result<DatabaseService, PageStoreError> {
        let name = descriptor.database.as_deref().ok_or_else(|| {
            PageStoreError::configuration(format!(
                "The model '{}' must declare a database name",
                descriptor.kind
            ))
        })?;
        self.resolve(name)
    }
}
