//! Identity Cache
//!
//! Maps page uuids to the latest known node snapshot so pages can be found
//! by their stable identity without walking the tree. Entries are added
//! when nodes are hydrated or created and cleared before structural changes.

use crate::models::Node;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// uuid → node lookup
#[derive(Debug, Clone, Default)]
pub struct IdentityCache {
    entries: Arc<RwLock<HashMap<String, Node>>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the snapshot for the node's uuid
    pub async fn register(&self, node: &Node) {
        let mut entries = self.entries.write().await;
        entries.insert(node.uuid().to_string(), node.clone());
    }

    pub async fn lookup(&self, uuid: &str) -> Option<Node> {
        let entries = self.entries.read().await;
        entries.get(uuid).cloned()
    }

    /// Remove the entry for `uuid`
    ///
    /// With `recursive`, every registered descendant is removed as well.
    /// Returns the number of removed entries.
    pub async fn clear(&self, uuid: &str, recursive: bool) -> usize {
        let mut entries = self.entries.write().await;

        let mut removed = 0;
        if entries.remove(uuid).is_some() {
            removed += 1;
        }

        if recursive {
            let mut pending = vec![uuid.to_string()];
            while let Some(parent) = pending.pop() {
                let children: Vec<String> = entries
                    .iter()
                    .filter(|(_, node)| node.parent_uuid() == Some(parent.as_str()))
                    .map(|(child, _)| child.clone())
                    .collect();

                for child in children {
                    entries.remove(&child);
                    removed += 1;
                    pending.push(child);
                }
            }
        }

        tracing::debug!("Cleared {} identity entries for {}", removed, uuid);
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every entry
    pub async fn reset(&self) {
        self.entries.write().await.clear();
    }
}
