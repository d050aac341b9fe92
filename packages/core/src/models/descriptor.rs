//! Node kind descriptors
//!
//! Every node kind stored in a table is described by a [`ModelDescriptor`]:
//! which database and table hold its rows, which custom fields it accepts,
//! which kind its children are, and how its children are numbered. All
//! descriptors are collected in a [`ModelRegistry`] that is validated once
//! when the page tree is built.

use crate::db::schema::{validate_identifier, ADMINISTRATIVE_COLUMNS};
use crate::db::ConnectionResolver;
use crate::services::PageStoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Numbering scheme for listed children
///
/// Only `Default` pages are resequenced when a sibling is unlisted or deleted;
/// the other schemes derive their numbers from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumScheme {
    #[default]
    Default,
    Zero,
    Date,
}

/// Static description of one node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Kind name, e.g. `"article"`
    pub kind: String,

    /// Logical database name (resolved through `database.<name>`)
    #[serde(default)]
    pub database: Option<String>,

    /// Table holding one row per (page, version, language)
    pub table: String,

    /// Custom columns accepted on write
    #[serde(default)]
    pub fields: Vec<String>,

    /// Kind of the pages listed as children
    #[serde(default)]
    pub child_model: Option<String>,

    #[serde(default)]
    pub num_scheme: NumScheme,
}

impl ModelDescriptor {
    pub fn new(kind: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            database: None,
            table: table.into(),
            fields: Vec::new(),
            child_model: None,
            num_scheme: NumScheme::Default,
        }
    }

    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.database = Some(name.into());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_child_model(mut self, kind: impl Into<String>) -> Self {
        self.child_model = Some(kind.into());
        self
    }

    pub fn with_num_scheme(mut self, scheme: NumScheme) -> Self {
        self.num_scheme = scheme;
        self
    }

    /// Check names that end up in SQL
    fn validate(&self) -> Result<(), PageStoreError> {
        validate_identifier(&self.table).map_err(|_| {
            PageStoreError::configuration(format!(
                "The model '{}' declares an invalid table name '{}'",
                self.kind, self.table
            ))
        })?;

        for field in &self.fields {
            if validate_identifier(field).is_err() || ADMINISTRATIVE_COLUMNS.contains(&field.as_str())
            {
                return Err(PageStoreError::configuration(format!(
                    "The model '{}' declares an invalid custom field '{}'",
                    self.kind, field
                )));
            }
        }

        Ok(())
    }
}

/// All node kinds known to a page tree
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<ModelDescriptor>>,
    root_model: Option<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor, replacing any previous one of the same kind
    pub fn register(mut self, descriptor: ModelDescriptor) -> Self {
        self.models
            .insert(descriptor.kind.clone(), Arc::new(descriptor));
        self
    }

    /// Kind of the top-level pages (rows whose parent is NULL)
    pub fn with_root_model(mut self, kind: impl Into<String>) -> Self {
        self.root_model = Some(kind.into());
        self
    }

    pub fn get(&self, kind: &str) -> Result<Arc<ModelDescriptor>, PageStoreError> {
        self.models.get(kind).cloned().ok_or_else(|| {
            PageStoreError::configuration(format!("The model '{}' is not registered", kind))
        })
    }

    /// Descriptor of the children of `kind`
    ///
    /// # Errors
    ///
    /// `Configuration` when `kind` declares no child model.
    pub fn child_of(&self, kind: &str) -> Result<Arc<ModelDescriptor>, PageStoreError> {
        let parent = self.get(kind)?;
        let child = parent.child_model.as_deref().ok_or_else(|| {
            PageStoreError::configuration(format!(
                "The model '{}' must declare a child model",
                kind
            ))
        })?;
        self.get(child)
    }

    /// Descriptor of the top-level pages
    pub fn root(&self) -> Result<Arc<ModelDescriptor>, PageStoreError> {
        let kind = self.root_model.as_deref().ok_or_else(|| {
            PageStoreError::configuration("The registry must declare a root model")
        })?;
        self.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Validate every descriptor against the registry and the resolver
    ///
    /// Checks identifiers, declared database names, and that child and root
    /// models reference registered kinds.
    pub fn validate(&self, resolver: &ConnectionResolver) -> Result<(), PageStoreError> {
        for descriptor in self.models.values() {
            descriptor.validate()?;
            resolver.resolve_for_model(descriptor)?;

            if let Some(child) = &descriptor.child_model {
                if !self.models.contains_key(child) {
                    return Err(PageStoreError::configuration(format!(
                        "The model '{}' declares the unknown child model '{}'",
                        descriptor.kind, child
                    )));
                }
            }
        }

        if let Some(root) = &self.root_model {
            self.get(root)?;
        }

        Ok(())
    }
}
