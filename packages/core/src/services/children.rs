//! Children Loader and memoized child collections
//!
//! [`ChildrenLoader`] queries the direct children (or drafts) of a parent
//! from the child kind's table and hydrates them through the
//! [`NodeFactory`]. [`ChildCollections`] memoizes the loaded collections per
//! parent until they are explicitly invalidated; lifecycle operations patch
//! the collections that are already loaded and leave the others alone.

use crate::db::{ConnectionResolver, Fields};
use crate::models::{Languages, ModelDescriptor, Node, Pages, ParentRef, VersionId};
use crate::services::{NodeFactory, PageStoreError};
use crate::storage::TableQuery;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Loads ordered child collections from rows
#[derive(Debug, Clone)]
pub struct ChildrenLoader {
    resolver: ConnectionResolver,
    factory: NodeFactory,
    languages: Languages,
}

impl ChildrenLoader {
    pub fn new(resolver: ConnectionResolver, factory: NodeFactory, languages: Languages) -> Self {
        Self {
            resolver,
            factory,
            languages,
        }
    }

    /// Published (`draft = false`) or draft children of `parent`
    ///
    /// `parent` is `None` for the top of the tree. Rows are read from the
    /// `latest` version in the default language, in sibling order.
    pub async fn from_rows(
        &self,
        parent: Option<&ParentRef>,
        child: &ModelDescriptor,
        draft: bool,
    ) -> Result<Pages, PageStoreError> {
        let db = self.resolver.resolve_for_model(child)?;
        let default_language = self.languages.default();
        let parent_value = parent
            .map(|p| Value::String(p.uuid.clone()))
            .unwrap_or(Value::Null);

        let siblings = TableQuery::new(db, child.table.clone())
            .filter("parent", parent_value)
            .filter("version", VersionId::LATEST)
            .filter("draft", i64::from(draft));

        let rows = siblings
            .clone()
            .filter("language", default_language.code())
            .in_sibling_order()
            .all()
            .await?;

        let translations = if self.languages.is_multilingual() && !rows.is_empty() {
            translated_slugs(siblings.all().await?, default_language.code())
        } else {
            HashMap::new()
        };

        let mut pages = Pages::new();
        for row in &rows {
            let node_translations = row
                .get("uuid")
                .and_then(Value::as_str)
                .and_then(|uuid| translations.get(uuid));
            let node = self
                .factory
                .from_row(parent, child, row, node_translations)
                .await?;
            pages.append(node);
        }

        tracing::debug!(
            "Loaded {} {} of {} from '{}'",
            pages.len(),
            if draft { "drafts" } else { "children" },
            parent.map(|p| p.id.as_str()).unwrap_or("/"),
            child.table
        );

        Ok(pages)
    }
}

/// uuid → (language → slug) for every non-default row
fn translated_slugs(rows: Vec<Fields>, default_language: &str) -> HashMap<String, BTreeMap<String, String>> {
    let mut translations: HashMap<String, BTreeMap<String, String>> = HashMap::new();
    for row in rows {
        let text = |column: &str| row.get(column).and_then(Value::as_str).map(str::to_string);
        if let (Some(uuid), Some(language), Some(slug)) = (text("uuid"), text("language"), text("slug")) {
            if language != default_language {
                translations.entry(uuid).or_default().insert(language, slug);
            }
        }
    }
    translations
}

/// Which collection of a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildView {
    Children,
    Drafts,
    /// Children followed by drafts
    Combined,
}

impl ChildView {
    /// The view a node belongs to besides `Combined`
    pub fn of(node: &Node) -> Self {
        if node.is_draft() {
            Self::Drafts
        } else {
            Self::Children
        }
    }
}

type CollectionKey = (Option<String>, ChildView);

/// Memoized child collections, keyed by parent uuid (`None` for the top)
#[derive(Debug, Clone, Default)]
pub struct ChildCollections {
    collections: Arc<RwLock<HashMap<CollectionKey, Pages>>>,
}

fn collection_key(parent: Option<&str>, view: ChildView) -> CollectionKey {
    (parent.map(str::to_string), view)
}

impl ChildCollections {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, parent: Option<&str>, view: ChildView) -> Option<Pages> {
        let collections = self.collections.read().await;
        collections.get(&collection_key(parent, view)).cloned()
    }

    pub async fn is_loaded(&self, parent: Option<&str>, view: ChildView) -> bool {
        let collections = self.collections.read().await;
        collections.contains_key(&collection_key(parent, view))
    }

    pub async fn store(&self, parent: Option<&str>, view: ChildView, pages: Pages) {
        let mut collections = self.collections.write().await;
        collections.insert(collection_key(parent, view), pages);
    }

    /// Replace the node in place (or add it) if the collection is loaded
    pub async fn set_node(&self, parent: Option<&str>, view: ChildView, node: &Node) {
        let mut collections = self.collections.write().await;
        if let Some(pages) = collections.get_mut(&collection_key(parent, view)) {
            pages.set(node.clone());
        }
    }

    /// Add the node at the end if the collection is loaded
    pub async fn append_node(&self, parent: Option<&str>, view: ChildView, node: &Node) {
        let mut collections = self.collections.write().await;
        if let Some(pages) = collections.get_mut(&collection_key(parent, view)) {
            pages.append(node.clone());
        }
    }

    pub async fn remove_node(&self, parent: Option<&str>, view: ChildView, uuid: &str) {
        let mut collections = self.collections.write().await;
        if let Some(pages) = collections.get_mut(&collection_key(parent, view)) {
            pages.remove(uuid);
        }
    }

    /// Remove the node from every view of its parent
    pub async fn remove_everywhere(&self, parent: Option<&str>, uuid: &str) {
        for view in [ChildView::Children, ChildView::Drafts, ChildView::Combined] {
            self.remove_node(parent, view, uuid).await;
        }
    }

    /// Forget every view of one parent
    pub async fn invalidate(&self, parent: Option<&str>) {
        let mut collections = self.collections.write().await;
        collections.retain(|(key, _), _| key.as_deref() != parent);
    }

    pub async fn reset(&self) {
        self.collections.write().await.clear();
    }
}
