//! Node Factory
//!
//! Hydrates nodes from fetched rows. Besides building the snapshot it
//! registers the node's identity and pre-fills the version cache with the
//! row, so reading the content right after listing costs no extra query.

use crate::db::Fields;
use crate::models::{Language, ModelDescriptor, Node, ParentRef, VersionId};
use crate::services::{IdentityCache, PageStoreError, VersionCache};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct NodeFactory {
    identity: IdentityCache,
    versions: VersionCache,
    default_language: Language,
}

impl NodeFactory {
    pub fn new(identity: IdentityCache, versions: VersionCache, default_language: Language) -> Self {
        Self {
            identity,
            versions,
            default_language,
        }
    }

    /// Build a node from a default-language `latest` row
    ///
    /// `translations` maps language codes to the slugs of that language's
    /// rows; entries equal to the default slug are ignored.
    pub async fn from_row(
        &self,
        parent: Option<&ParentRef>,
        descriptor: &ModelDescriptor,
        row: &Fields,
        translations: Option<&BTreeMap<String, String>>,
    ) -> Result<Node, PageStoreError> {
        let mut node = Node::from_row(parent, &descriptor.kind, row)?;

        if let Some(translations) = translations {
            for (language, slug) in translations {
                if slug != node.slug() {
                    node = node.with_translated_slug(language.clone(), slug.clone());
                }
            }
        }

        self.versions
            .set(
                node.uuid(),
                &VersionId::latest(),
                &self.default_language,
                row.clone(),
            )
            .await;
        self.identity.register(&node).await;

        Ok(node)
    }
}
