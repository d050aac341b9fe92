//! Page lifecycle operations
//!
//! A page moves through `Draft → Listed ⇄ Unlisted → Deleted`. Every
//! operation takes the current snapshot and returns the new one; the rows,
//! the identity and version caches and the loaded child collections are
//! brought in line before it returns.
//!
//! Operations never re-check what the backing store guarantees: two writers
//! racing for the same slug are resolved by the table's unique index and
//! surface as `ConstraintViolation`.

use crate::db::Fields;
use crate::models::{slug, Language, Node, NumScheme, VersionId};
use crate::operations::{Action, HookEvent};
use crate::services::{ChildView, PageStoreError, PageTree};
use crate::storage::ContentSnapshot;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

type BoxedResult<'a> = Pin<Box<dyn Future<Output = Result<(), PageStoreError>> + Send + 'a>>;

fn assignment(column: &str, value: Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert(column.to_string(), value);
    fields
}

impl PageTree {
    /// Change the sorting number of a published page
    ///
    /// `None` turns a listed page into an unlisted one. Siblings are not
    /// resequenced.
    ///
    /// # Errors
    ///
    /// `Precondition` for drafts and for negative numbers.
    pub async fn change_num(&self, node: &Node, num: Option<i64>) -> Result<Node, PageStoreError> {
        if node.is_draft() {
            return Err(PageStoreError::precondition(
                "Drafts cannot change their sorting number",
            ));
        }
        if num.is_some_and(|num| num < 0) {
            return Err(PageStoreError::precondition(
                "The sorting number must not be negative",
            ));
        }
        if node.num() == num {
            return Ok(node.clone());
        }

        self.hooks.before(Action::ChangeNum, node).await?;

        let new = node.clone().with_num(num);
        let num_value = num.map(Value::from).unwrap_or(Value::Null);
        self.storage(node)?
            .rows(&[])
            .update(&assignment("num", num_value))
            .await?;

        let parent = node.parent_uuid();
        self.collections
            .set_node(parent, ChildView::Children, &new)
            .await;
        self.collections
            .set_node(parent, ChildView::Combined, &new)
            .await;
        self.identity.register(&new).await;

        tracing::info!("Changed num of {} from {:?} to {:?}", node.id(), node.num(), num);

        self.hooks
            .after(&HookEvent::Changed {
                action: Action::ChangeNum,
                old: node.clone(),
                new: new.clone(),
            })
            .await?;

        Ok(new)
    }

    /// Change the slug of a page
    ///
    /// The slug is normalized first. `language` selects the translation to
    /// rename; `None`, `"default"` and `"current"` rename the default slug.
    ///
    /// # Errors
    ///
    /// - `UnknownLanguage` for a language that is not configured
    /// - `DuplicateSlug` when a sibling or draft already uses the slug
    /// - `Precondition` for an empty slug or a missing translation
    pub async fn change_slug(
        &self,
        node: &Node,
        slug: &str,
        language: Option<&str>,
    ) -> Result<Node, PageStoreError> {
        let slug = slug::normalize(slug);
        let language = self.languages.ensure(language)?;

        if !language.is_default() {
            return self.change_slug_for_language(node, slug, &language).await;
        }

        if slug == node.slug() {
            return Ok(node.clone());
        }
        if slug.is_empty() {
            return Err(PageStoreError::precondition("The slug must not be empty"));
        }

        self.ensure_unique_slug(node, &slug, &language).await?;
        self.hooks.before(Action::ChangeSlug, node).await?;

        let new = node.clone().with_slug(slug.clone());

        self.identity.clear(node.uuid(), true).await;

        if self.exists(node).await? {
            self.storage(node)?
                .rows(&[("slug", Value::from(node.slug()))])
                .update(&assignment("slug", Value::from(slug.as_str())))
                .await?;

            self.versions.reset().await;

            // the renamed page replaces the old snapshot at the same position
            let parent = node.parent_uuid();
            self.collections
                .set_node(parent, ChildView::of(node), &new)
                .await;
            self.collections
                .set_node(parent, ChildView::Combined, &new)
                .await;
            // paths of the children changed with the slug
            self.collections.invalidate(Some(node.uuid())).await;

            if let Err(e) = self.media.remove(node).await {
                tracing::warn!("Failed to remove media of {}: {}", node.id(), e);
            }
        }

        self.identity.register(&new).await;

        tracing::info!("Changed slug of {} to {}", node.id(), new.id());

        self.hooks
            .after(&HookEvent::Changed {
                action: Action::ChangeSlug,
                old: node.clone(),
                new: new.clone(),
            })
            .await?;

        Ok(new)
    }

    /// Rename the slug of one translation
    ///
    /// An empty slug resets the translation to the default slug.
    async fn change_slug_for_language(
        &self,
        node: &Node,
        slug: String,
        language: &Language,
    ) -> Result<Node, PageStoreError> {
        let code = language.code();
        let slug = if slug.is_empty() {
            node.slug().to_string()
        } else {
            slug
        };

        if slug == node.slug_for(code) {
            return Ok(node.clone());
        }

        let storage = self.storage(node)?;
        let translation = storage.rows(&[("language", Value::from(code))]);
        if translation.first().await?.is_none() {
            return Err(PageStoreError::precondition(format!(
                "The translation '{}' of {} does not exist",
                code,
                node.id()
            )));
        }

        self.ensure_unique_slug(node, &slug, language).await?;
        self.hooks.before(Action::ChangeSlug, node).await?;

        translation
            .update(&assignment("slug", Value::from(slug.as_str())))
            .await?;

        let new = node.clone().with_translated_slug(code, slug.clone());

        self.versions.remove_node(node.uuid()).await;
        self.identity.register(&new).await;

        let parent = node.parent_uuid();
        self.collections
            .set_node(parent, ChildView::of(node), &new)
            .await;
        self.collections
            .set_node(parent, ChildView::Combined, &new)
            .await;

        tracing::info!("Changed {} slug of {} to {}", code, node.id(), slug);

        self.hooks
            .after(&HookEvent::Changed {
                action: Action::ChangeSlug,
                old: node.clone(),
                new: new.clone(),
            })
            .await?;

        Ok(new)
    }

    async fn ensure_unique_slug(
        &self,
        node: &Node,
        slug: &str,
        language: &Language,
    ) -> Result<(), PageStoreError> {
        let descriptor = self.descriptor(node)?;
        let siblings = self
            .collection(node.parent(), &descriptor, ChildView::Combined)
            .await?;

        let taken = siblings
            .iter()
            .any(|sibling| sibling.uuid() != node.uuid() && sibling.slug_for(language.code()) == slug);

        if taken {
            let parent = node.parent().map(|p| p.id.as_str()).unwrap_or("/");
            return Err(PageStoreError::duplicate_slug(slug, parent));
        }
        Ok(())
    }

    /// Publish a draft as an unlisted page
    pub async fn publish(&self, node: &Node) -> Result<Node, PageStoreError> {
        if !node.is_draft() {
            return Ok(node.clone());
        }

        self.hooks.before(Action::ChangeStatus, node).await?;

        let new = node.clone().with_draft(false);
        self.storage(node)?
            .rows(&[])
            .update(&assignment("draft", Value::from(0)))
            .await?;

        let parent = node.parent_uuid();
        self.collections
            .remove_node(parent, ChildView::Drafts, node.uuid())
            .await;
        self.collections
            .append_node(parent, ChildView::Children, &new)
            .await;
        self.collections
            .set_node(parent, ChildView::Combined, &new)
            .await;
        self.identity.register(&new).await;

        tracing::info!("Published {}", node.id());

        self.hooks
            .after(&HookEvent::Changed {
                action: Action::ChangeStatus,
                old: node.clone(),
                new: new.clone(),
            })
            .await?;

        Ok(new)
    }

    /// Turn a published page back into a draft
    ///
    /// The sorting number is dropped and the remaining listed siblings are
    /// resequenced.
    pub async fn unpublish(&self, node: &Node) -> Result<Node, PageStoreError> {
        if node.is_draft() {
            return Ok(node.clone());
        }

        self.hooks.before(Action::ChangeStatus, node).await?;

        let new = node.clone().with_draft(true).with_num(None);

        let mut update = assignment("draft", Value::from(1));
        update.insert("num".to_string(), Value::Null);
        self.storage(node)?.rows(&[]).update(&update).await?;

        let parent = node.parent_uuid();
        self.collections
            .remove_node(parent, ChildView::Children, node.uuid())
            .await;
        self.collections
            .append_node(parent, ChildView::Drafts, &new)
            .await;
        self.collections
            .set_node(parent, ChildView::Combined, &new)
            .await;
        self.identity.register(&new).await;

        self.resort_siblings_after_unlisting(&new).await?;

        tracing::info!("Unpublished {}", node.id());

        self.hooks
            .after(&HookEvent::Changed {
                action: Action::ChangeStatus,
                old: node.clone(),
                new: new.clone(),
            })
            .await?;

        Ok(new)
    }

    /// Delete a page with all of its rows, attachments and descendants
    ///
    /// # Errors
    ///
    /// `HasChildren` when `force` is false and the page has children or
    /// drafts.
    pub async fn delete(&self, node: &Node, force: bool) -> Result<(), PageStoreError> {
        self.delete_node(node, force, false).await
    }

    fn delete_node<'a>(&'a self, node: &'a Node, force: bool, cascade: bool) -> BoxedResult<'a> {
        Box::pin(async move {
            let descriptor = self.descriptor(node)?;
            let storage = self.storage(node)?;

            // rows are gone after this call, hooks read the snapshot
            let snapshot = ContentSnapshot::capture(&storage).await?;

            let descendants = self.descendants(node).await?;
            if !force && !descendants.is_empty() {
                return Err(PageStoreError::has_children(node.id()));
            }

            self.hooks.before(Action::Delete, node).await?;

            self.identity.clear(node.uuid(), false).await;

            for attachment in self.attachments.list(node).await? {
                self.attachments.delete(&attachment).await?;
            }

            for child in &descendants {
                self.delete_node(child, true, true).await?;
            }

            let removed = storage.rows(&[]).delete().await?;
            self.versions.remove_node(node.uuid()).await;

            self.collections
                .remove_everywhere(node.parent_uuid(), node.uuid())
                .await;
            self.collections.invalidate(Some(node.uuid())).await;

            if let Err(e) = self.media.remove(node).await {
                tracing::warn!("Failed to remove media of {}: {}", node.id(), e);
            }

            if node.is_listed() && descriptor.num_scheme == NumScheme::Default && !cascade {
                self.resort_siblings_after_unlisting(node).await?;
            }

            tracing::info!("Deleted {} ({} rows)", node.id(), removed);

            self.hooks
                .after(&HookEvent::Deleted {
                    node: node.clone(),
                    snapshot,
                })
                .await?;

            Ok(())
        })
    }

    /// Copying pages is not supported by relational storage
    pub async fn copy(&self, node: &Node) -> Result<Node, PageStoreError> {
        Err(PageStoreError::unsupported(format!(
            "Copying the page {} in a database is not supported",
            node.id()
        )))
    }

    /// Moving pages is not supported by relational storage
    pub async fn move_to(&self, node: &Node, _parent: Option<&Node>) -> Result<Node, PageStoreError> {
        Err(PageStoreError::unsupported(format!(
            "Moving the page {} in a database is not supported",
            node.id()
        )))
    }

    /// Read the `latest` content of `node` in every configured language
    pub async fn translations(&self, node: &Node) -> Result<Vec<(Language, Fields)>, PageStoreError> {
        let mut translations = Vec::new();
        for language in self.languages.all() {
            let fields = self.content(node, &VersionId::latest(), &language).await?;
            if !fields.is_empty() {
                translations.push((language, fields));
            }
        }
        Ok(translations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_table;
    use crate::db::{ConnectionResolver, DatabaseService};
    use crate::models::{Languages, ModelDescriptor, ModelRegistry, NewPage, NodeStatus};
    use crate::operations::CommitHooks;
    use crate::storage::Storage;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
        reject: Option<Action>,
    }

    #[async_trait]
    impl CommitHooks for RecordingHooks {
        async fn before(&self, action: Action, node: &Node) -> Result<(), PageStoreError> {
            if self.reject == Some(action) {
                return Err(PageStoreError::precondition("rejected by hook"));
            }
            self.events
                .lock()
                .unwrap()
                .push(format!("before {} {}", action, node.slug()));
            Ok(())
        }

        async fn after(&self, event: &HookEvent) -> Result<(), PageStoreError> {
            let line = match event {
                HookEvent::Changed { action, new, .. } => format!("after {} {}", action, new.slug()),
                HookEvent::Deleted { node, snapshot } => {
                    format!("after delete {} {}", node.slug(), snapshot.len())
                }
            };
            self.events.lock().unwrap().push(line);
            Ok(())
        }
    }

    async fn tree(languages: Languages) -> (PageTree, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        create_table(&db, "articles", &["text".to_string()]).await.unwrap();

        let registry = ModelRegistry::new()
            .register(
                ModelDescriptor::new("article", "articles")
                    .with_database("main")
                    .with_fields(["text"])
                    .with_child_model("article"),
            )
            .with_root_model("article");

        let tree = PageTree::new(ConnectionResolver::new().with("main", db), registry, languages)
            .unwrap();
        (tree, temp_dir)
    }

    async fn listed(tree: &PageTree, slug: &str, num: i64) -> Node {
        tree.create_page(None, NewPage::new(slug, "article").published(Some(num)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_change_num_rejects_drafts_and_negatives() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        let draft = tree.create_page(None, NewPage::new("a", "article")).await.unwrap();
        assert!(tree.change_num(&draft, Some(1)).await.unwrap_err().is_precondition());

        let page = tree.publish(&draft).await.unwrap();
        assert!(tree.change_num(&page, Some(-1)).await.unwrap_err().is_precondition());
    }

    #[tokio::test]
    async fn test_change_num_is_idempotent() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        let hooks = Arc::new(RecordingHooks::default());
        let tree = tree.with_hooks(hooks.clone());
        let page = listed(&tree, "a", 3).await;

        let storage = tree.storage(&page).unwrap();
        let stale = assignment("modified", Value::from("2000-01-01 00:00:00"));
        storage.rows(&[]).update(&stale).await.unwrap();

        let same = tree.change_num(&page, Some(3)).await.unwrap();
        assert_eq!(same, page);
        assert!(hooks.events.lock().unwrap().is_empty());
        let row = storage.rows(&[]).first().await.unwrap().unwrap();
        assert_eq!(row["modified"], Value::from("2000-01-01 00:00:00"));

        let moved = tree.change_num(&page, Some(5)).await.unwrap();
        assert_eq!(moved.num(), Some(5));
        assert_eq!(page.num(), Some(3));
        assert_eq!(
            hooks.events.lock().unwrap().clone(),
            vec!["before changeNum a", "after changeNum a"]
        );

        let unlisted = tree.change_num(&moved, None).await.unwrap();
        assert_eq!(unlisted.status(), NodeStatus::Unlisted);
        let row = tree.storage(&unlisted).unwrap().rows(&[]).first().await.unwrap().unwrap();
        assert_eq!(row["num"], Value::Null);
    }

    #[tokio::test]
    async fn test_change_num_updates_loaded_children() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        let page = listed(&tree, "a", 1).await;
        assert_eq!(tree.children(None).await.unwrap().get(page.uuid()).unwrap().num(), Some(1));

        tree.change_num(&page, Some(4)).await.unwrap();
        assert_eq!(tree.children(None).await.unwrap().get(page.uuid()).unwrap().num(), Some(4));
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        listed(&tree, "taken", 1).await;
        let page = tree.create_page(None, NewPage::new("free", "article")).await.unwrap();

        let err = tree.change_slug(&page, "Taken", None).await.unwrap_err();
        assert!(matches!(err, PageStoreError::DuplicateSlug { .. }));
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_change_slug_updates_rows_and_caches() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        let page = listed(&tree, "hello", 1).await;
        let children = tree.children(None).await.unwrap();
        assert_eq!(children.slugs(), vec!["hello"]);

        let renamed = tree.change_slug(&page, "Hello World", None).await.unwrap();
        assert_eq!(renamed.slug(), "hello-world");
        assert_eq!(renamed.uuid(), page.uuid());
        assert_eq!(page.slug(), "hello");

        let latest = VersionId::latest();
        let en = tree.languages().default();
        assert!(!tree.storage(&page).unwrap().exists(&latest, &en).await.unwrap());
        assert!(tree.storage(&renamed).unwrap().exists(&latest, &en).await.unwrap());
        assert_eq!(tree.children(None).await.unwrap().slugs(), vec!["hello-world"]);
        assert_eq!(tree.find_by_uuid(page.uuid()).await.unwrap().slug(), "hello-world");

        let unchanged = tree.change_slug(&renamed, "hello-world", None).await.unwrap();
        assert_eq!(unchanged, renamed);
    }

    #[tokio::test]
    async fn test_change_slug_for_language() {
        let (tree, _temp) = tree(Languages::new("en", vec!["de".to_string()])).await;
        let page = listed(&tree, "hello", 1).await;
        let de = tree.languages().ensure(Some("de")).unwrap();

        let err = tree.change_slug(&page, "hallo", Some("de")).await.unwrap_err();
        assert!(err.is_precondition());

        tree.save_content(&page, &VersionId::latest(), &de, &Fields::new())
            .await
            .unwrap();
        let translated = tree.change_slug(&page, "Hallo", Some("de")).await.unwrap();
        assert_eq!(translated.slug(), "hello");
        assert_eq!(translated.slug_for("de"), "hallo");

        let storage = tree.storage(&translated).unwrap();
        assert!(storage.exists(&VersionId::latest(), &de).await.unwrap());
        assert!(storage
            .exists(&VersionId::latest(), &tree.languages().default())
            .await
            .unwrap());

        let err = tree.change_slug(&page, "x", Some("fr")).await.unwrap_err();
        assert!(matches!(err, PageStoreError::UnknownLanguage { .. }));
    }

    #[tokio::test]
    async fn test_reset_translation_follows_default_rename() {
        let (tree, _temp) = tree(Languages::new("en", vec!["de".to_string()])).await;
        let page = listed(&tree, "hello", 1).await;
        let latest = VersionId::latest();
        let de = tree.languages().ensure(Some("de")).unwrap();
        tree.save_content(&page, &latest, &de, &Fields::new()).await.unwrap();

        let translated = tree.change_slug(&page, "hallo", Some("de")).await.unwrap();
        let reset = tree.change_slug(&translated, "", Some("de")).await.unwrap();
        assert_eq!(reset.slug_for("de"), "hello");

        let renamed = tree.change_slug(&reset, "world", None).await.unwrap();
        assert_eq!(renamed.slug_for("de"), "world");

        let storage = tree.storage(&renamed).unwrap();
        assert!(storage.exists(&latest, &de).await.unwrap());
        assert!(storage.exists(&latest, &tree.languages().default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_default_rename_keeps_distinct_translation() {
        let (tree, _temp) = tree(Languages::new("en", vec!["de".to_string()])).await;
        let page = listed(&tree, "hello", 1).await;
        let latest = VersionId::latest();
        let de = tree.languages().ensure(Some("de")).unwrap();
        tree.save_content(&page, &latest, &de, &Fields::new()).await.unwrap();

        let translated = tree.change_slug(&page, "hallo", Some("de")).await.unwrap();
        let renamed = tree.change_slug(&translated, "world", None).await.unwrap();
        assert_eq!(renamed.slug_for("de"), "hallo");

        let row = tree.storage(&renamed).unwrap().row(&latest, &de).first().await.unwrap().unwrap();
        assert_eq!(row["slug"], Value::from("hallo"));
    }

    #[tokio::test]
    async fn test_publish_and_unpublish_move_between_collections() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        let draft = tree.create_page(None, NewPage::new("a", "article")).await.unwrap();
        assert_eq!(tree.drafts(None).await.unwrap().len(), 1);
        assert_eq!(tree.children_and_drafts(None).await.unwrap().len(), 1);

        let published = tree.publish(&draft).await.unwrap();
        assert_eq!(published.status(), NodeStatus::Unlisted);
        assert!(tree.drafts(None).await.unwrap().is_empty());
        assert_eq!(tree.children(None).await.unwrap().slugs(), vec!["a"]);
        assert!(!tree
            .children_and_drafts(None)
            .await
            .unwrap()
            .get(draft.uuid())
            .unwrap()
            .is_draft());

        assert_eq!(tree.publish(&published).await.unwrap(), published);

        let listed = tree.change_num(&published, Some(2)).await.unwrap();
        let back = tree.unpublish(&listed).await.unwrap();
        assert!(back.is_draft());
        assert_eq!(back.num(), None);
        assert!(tree.children(None).await.unwrap().is_empty());
        assert_eq!(tree.drafts(None).await.unwrap().slugs(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_unpublish_resequences_listed_siblings() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        listed(&tree, "a", 1).await;
        let b = listed(&tree, "b", 2).await;
        listed(&tree, "c", 3).await;

        tree.unpublish(&b).await.unwrap();

        let children = tree.children(None).await.unwrap();
        let nums: Vec<(&str, Option<i64>)> = children.iter().map(|n| (n.slug(), n.num())).collect();
        assert_eq!(nums, vec![("a", Some(1)), ("c", Some(2))]);

        tree.invalidate_children(None).await;
        let reloaded = tree.children(None).await.unwrap();
        assert_eq!(reloaded.get(children.find("c").unwrap().uuid()).unwrap().num(), Some(2));
    }

    #[tokio::test]
    async fn test_non_forced_delete_with_children_fails() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        let parent = listed(&tree, "parent", 1).await;
        tree.create_page(Some(&parent), NewPage::new("child", "article"))
            .await
            .unwrap();

        let err = tree.delete(&parent, false).await.unwrap_err();
        assert!(matches!(err, PageStoreError::HasChildren { .. }));
        assert!(tree.exists(&parent).await.unwrap());
    }

    #[tokio::test]
    async fn test_hooks_observe_operations() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        let hooks = Arc::new(RecordingHooks::default());
        let tree = tree.with_hooks(hooks.clone());

        let page = tree.create_page(None, NewPage::new("a", "article")).await.unwrap();
        let page = tree.publish(&page).await.unwrap();
        tree.delete(&page, false).await.unwrap();

        let events = hooks.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "before changeStatus a",
                "after changeStatus a",
                "before delete a",
                "after delete a 1",
            ]
        );
    }

    #[tokio::test]
    async fn test_rejecting_hook_leaves_rows_untouched() {
        let (tree, _temp) = tree(Languages::single("en")).await;
        let hooks = Arc::new(RecordingHooks {
            reject: Some(Action::Delete),
            ..Default::default()
        });
        let tree = tree.with_hooks(hooks);

        let page = listed(&tree, "a", 1).await;
        assert!(tree.delete(&page, true).await.unwrap_err().is_precondition());
        assert!(tree.exists(&page).await.unwrap());
    }

    #[tokio::test]
    async fn test_translations_lists_existing_languages() {
        let (tree, _temp) = tree(Languages::new("en", vec!["de".to_string()])).await;
        let page = listed(&tree, "a", 1).await;

        let translations = tree.translations(&page).await.unwrap();
        assert_eq!(translations.len(), 1);
        assert!(translations[0].0.is_default());
    }
}
