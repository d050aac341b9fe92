//! Page Node Data Structures
//!
//! A [`Node`] is an immutable snapshot of one page: its identity, position
//! in the tree, and lifecycle state. Lifecycle operations never mutate a
//! node; they return a new snapshot and leave the old one as it was.
//!
//! # Examples
//!
//! ```rust
//! use rowpages_core::models::{Node, NodeStatus};
//!
//! let node = Node::new("article", "hello", "article");
//! assert_eq!(node.status(), NodeStatus::Draft);
//! assert_eq!(node.id(), "hello");
//! ```

use crate::db::Fields;
use crate::services::PageStoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle state of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Not yet published
    Draft,
    /// Published with a sorting number
    Listed,
    /// Published without a sorting number
    Unlisted,
}

/// Reference to the containing page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    /// Identity stored in the child's `parent` column
    pub uuid: String,

    /// Slug path of the parent
    pub id: String,

    /// Uuid path of the parent, stable across renames
    #[serde(default)]
    pub dir: String,
}

impl ParentRef {
    /// Reference to a top-level parent
    pub fn new(uuid: impl Into<String>, id: impl Into<String>) -> Self {
        let uuid = uuid.into();
        Self {
            dir: uuid.clone(),
            uuid,
            id: id.into(),
        }
    }

    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = dir.into();
        self
    }
}

/// Immutable page snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    uuid: String,
    kind: String,
    slug: String,
    title: Option<String>,
    template: String,
    num: Option<i64>,
    draft: bool,
    parent: Option<ParentRef>,

    /// Slugs of non-default languages that differ from `slug`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    translated_slugs: BTreeMap<String, String>,
}

impl Node {
    /// Create a new top-level draft with a fresh identity
    pub fn new(kind: impl Into<String>, slug: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().simple().to_string(),
            kind: kind.into(),
            slug: slug.into(),
            title: None,
            template: template.into(),
            num: None,
            draft: true,
            parent: None,
            translated_slugs: BTreeMap::new(),
        }
    }

    /// Hydrate a node from a fetched row
    ///
    /// The row must carry `uuid` and `slug`. `num` may be NULL, `draft` is
    /// true only for the value 1.
    pub fn from_row(
        parent: Option<&ParentRef>,
        kind: &str,
        row: &Fields,
    ) -> Result<Self, PageStoreError> {
        let uuid = row_text(row, "uuid")
            .ok_or_else(|| PageStoreError::serialization("Page row without uuid"))?;
        let slug = row_text(row, "slug")
            .ok_or_else(|| PageStoreError::serialization(format!("Page row {} without slug", uuid)))?;

        Ok(Self {
            uuid,
            kind: kind.to_string(),
            slug,
            title: row_text(row, "title"),
            template: row_text(row, "template").unwrap_or_else(|| "default".to_string()),
            num: row_integer(row, "num"),
            draft: row_integer(row, "draft") == Some(1),
            parent: parent.cloned(),
            translated_slugs: BTreeMap::new(),
        })
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_parent(mut self, parent: Option<ParentRef>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_num(mut self, num: Option<i64>) -> Self {
        self.num = num;
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    /// Change the default slug
    ///
    /// Translations that used the old default slug follow the rename, since
    /// their rows are rewritten along with the default rows.
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        let old = std::mem::replace(&mut self.slug, slug.into());
        let new = self.slug.clone();
        self.translated_slugs
            .retain(|_, translated| *translated != old && *translated != new);
        self
    }

    /// Set the slug of a non-default language
    ///
    /// A slug equal to the default slug drops the translation entry.
    pub fn with_translated_slug(mut self, language: impl Into<String>, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        if slug == self.slug {
            self.translated_slugs.remove(&language.into());
        } else {
            self.translated_slugs.insert(language.into(), slug);
        }
        self
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Default-language slug
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Slug used by the rows of `language`, falling back to the default slug
    pub fn slug_for(&self, language: &str) -> &str {
        self.translated_slugs
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.slug)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn num(&self) -> Option<i64> {
        self.num
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    /// Identity written to the `parent` column
    pub fn parent_uuid(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.uuid.as_str())
    }

    pub fn is_draft(&self) -> bool {
        self.draft
    }

    pub fn is_listed(&self) -> bool {
        !self.draft && self.num.is_some()
    }

    pub fn status(&self) -> NodeStatus {
        match (self.draft, self.num) {
            (true, _) => NodeStatus::Draft,
            (false, Some(_)) => NodeStatus::Listed,
            (false, None) => NodeStatus::Unlisted,
        }
    }

    /// Slug path from the top of the tree
    pub fn id(&self) -> String {
        match &self.parent {
            Some(parent) if !parent.id.is_empty() => format!("{}/{}", parent.id, self.slug),
            _ => self.slug.clone(),
        }
    }

    /// Uuid path from the top of the tree
    ///
    /// Unlike [`Node::id`] it does not change when the page or one of its
    /// ancestors is renamed.
    pub fn diruri(&self) -> String {
        match &self.parent {
            Some(parent) if !parent.dir.is_empty() => format!("{}/{}", parent.dir, self.uuid),
            _ => self.uuid.clone(),
        }
    }

    /// Reference for pages created below this one
    pub fn as_parent(&self) -> ParentRef {
        ParentRef::new(self.uuid.clone(), self.id()).with_dir(self.diruri())
    }
}

fn row_text(row: &Fields, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn row_integer(row: &Fields, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Ordered collection of sibling pages, unique by uuid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pages {
    items: Vec<Node>,
}

impl Pages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.items.iter()
    }

    pub fn get(&self, uuid: &str) -> Option<&Node> {
        self.items.iter().find(|n| n.uuid == uuid)
    }

    /// Find a page by its default-language slug
    pub fn find(&self, slug: &str) -> Option<&Node> {
        self.items.iter().find(|n| n.slug == slug)
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.get(uuid).is_some()
    }

    /// Add at the end, dropping an older entry with the same uuid
    pub fn append(&mut self, node: Node) {
        self.items.retain(|n| n.uuid != node.uuid);
        self.items.push(node);
    }

    /// Replace in place, or add at the end
    pub fn set(&mut self, node: Node) {
        match self.items.iter_mut().find(|n| n.uuid == node.uuid) {
            Some(existing) => *existing = node,
            None => self.items.push(node),
        }
    }

    pub fn remove(&mut self, uuid: &str) -> Option<Node> {
        let index = self.items.iter().position(|n| n.uuid == uuid)?;
        Some(self.items.remove(index))
    }

    /// Published pages with a sorting number
    pub fn listed(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().filter(|n| n.is_listed())
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.items.iter().map(|n| n.slug()).collect()
    }

    pub fn into_vec(self) -> Vec<Node> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Pages {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Node> for Pages {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut pages = Pages::new();
        for node in iter {
            pages.append(node);
        }
        pages
    }
}

/// Input for creating a page
#[derive(Debug, Clone, Default)]
pub struct NewPage {
    pub slug: String,
    pub template: String,
    pub title: Option<String>,
    pub num: Option<i64>,
    pub draft: bool,
    pub fields: Fields,
    pub uuid: Option<String>,
}

impl NewPage {
    /// A draft with the given slug and template
    pub fn new(slug: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            template: template.into(),
            draft: true,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    /// Create as published; `num` decides listed vs. unlisted
    pub fn published(mut self, num: Option<i64>) -> Self {
        self.draft = false;
        self.num = num;
        self
    }
}
