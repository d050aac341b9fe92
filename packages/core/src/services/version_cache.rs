//! Version Cache
//!
//! Holds content read from storage, keyed by page uuid, version and
//! language. The node factory pre-fills it with the rows the children
//! loader already fetched so content is not read twice.

use crate::db::Fields;
use crate::models::{Language, VersionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Key = (String, String, String);

#[derive(Debug, Clone, Default)]
pub struct VersionCache {
    entries: Arc<RwLock<HashMap<Key, Fields>>>,
}

fn key(uuid: &str, version: &VersionId, language: &Language) -> Key {
    (
        uuid.to_string(),
        version.value().to_string(),
        language.code().to_string(),
    )
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, uuid: &str, version: &VersionId, language: &Language) -> Option<Fields> {
        let entries = self.entries.read().await;
        entries.get(&key(uuid, version, language)).cloned()
    }

    pub async fn set(&self, uuid: &str, version: &VersionId, language: &Language, fields: Fields) {
        let mut entries = self.entries.write().await;
        entries.insert(key(uuid, version, language), fields);
    }

    pub async fn remove(&self, uuid: &str, version: &VersionId, language: &Language) {
        let mut entries = self.entries.write().await;
        entries.remove(&key(uuid, version, language));
    }

    /// Drop every entry of one page
    pub async fn remove_node(&self, uuid: &str) {
        let mut entries = self.entries.write().await;
        entries.retain(|(entry, _, _), _| entry != uuid);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drop everything
    pub async fn reset(&self) {
        self.entries.write().await.clear();
        tracing::debug!("Version cache reset");
    }
}
