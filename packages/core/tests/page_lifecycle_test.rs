//! Page Lifecycle Tests
//!
//! Integration tests for the lifecycle of pages stored in table rows.
//!
//! ## Tree Used By The Tests
//!
//! - `blog` (root kind, table `blogs`) with children of kind `article`
//! - `article` (table `articles`, custom fields `text` and `tags`) with
//!   children of kind `comment`
//! - `comment` (table `comments`) without children
//!
//! ## Test Coverage
//! - hello → publish → change_num(1) → unpublish
//! - Renames visible through uuid lookups but not through the old slug
//! - Cascading deletes of children, drafts and attachments
//! - copy / move fail without touching rows

#[cfg(test)]
mod page_lifecycle_tests {
    use anyhow::Result;
    use rowpages_core::db::schema::create_table;
    use rowpages_core::models::{
        Languages, ModelDescriptor, ModelRegistry, NewPage, Node, NodeStatus, VersionId,
    };
    use rowpages_core::services::{DirectoryAttachments, PageTree};
    use rowpages_core::storage::Storage;
    use rowpages_core::{ConnectionResolver, DatabaseService};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Helper to create a tree backed by a fresh database
    async fn create_test_tree() -> Result<(PageTree, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db = DatabaseService::new(temp_dir.path().join("content.db")).await?;

        create_table(&db, "blogs", &[]).await?;
        create_table(&db, "articles", &["text".to_string(), "tags".to_string()]).await?;
        create_table(&db, "comments", &["text".to_string()]).await?;

        let registry = ModelRegistry::new()
            .register(
                ModelDescriptor::new("blog", "blogs")
                    .with_database("main")
                    .with_child_model("article"),
            )
            .register(
                ModelDescriptor::new("article", "articles")
                    .with_database("main")
                    .with_fields(["text", "tags"])
                    .with_child_model("comment"),
            )
            .register(
                ModelDescriptor::new("comment", "comments")
                    .with_database("main")
                    .with_fields(["text"]),
            )
            .with_root_model("blog");

        let tree = PageTree::new(
            ConnectionResolver::new().with("main", db),
            registry,
            Languages::single("en"),
        )?
        .with_attachments(Arc::new(DirectoryAttachments::new(temp_dir.path().join("content"))));

        Ok((tree, temp_dir))
    }

    async fn create_blog(tree: &PageTree) -> Result<Node> {
        Ok(tree
            .create_page(None, NewPage::new("blog", "blog").published(Some(1)))
            .await?)
    }

    #[tokio::test]
    async fn test_hello_publish_number_unpublish() -> Result<()> {
        let (tree, _temp_dir) = create_test_tree().await?;
        let blog = create_blog(&tree).await?;

        let hello = tree
            .create_page(Some(&blog), NewPage::new("hello", "article"))
            .await?;
        assert_eq!(hello.status(), NodeStatus::Draft);
        assert!(tree.exists(&hello).await?);

        let published = tree.publish(&hello).await?;
        assert_eq!(published.status(), NodeStatus::Unlisted);

        let listed = tree.change_num(&published, Some(1)).await?;
        assert_eq!(listed.status(), NodeStatus::Listed);
        assert_eq!(tree.children(Some(&blog)).await?.slugs(), vec!["hello"]);

        let draft = tree.unpublish(&listed).await?;
        assert!(draft.is_draft());
        assert_eq!(draft.num(), None);

        let row = tree
            .storage(&draft)?
            .read(&VersionId::latest(), &tree.languages().default())
            .await?;
        assert_eq!(row["draft"], json!(1));
        assert_eq!(row["num"], Value::Null);

        tree.invalidate_children(Some(&blog)).await;
        assert!(tree.children(Some(&blog)).await?.is_empty());
        assert_eq!(tree.drafts(Some(&blog)).await?.slugs(), vec!["hello"]);

        // snapshots stay valid as values
        assert_eq!(listed.num(), Some(1));
        assert!(!listed.is_draft());
        Ok(())
    }

    #[tokio::test]
    async fn test_rename_is_visible_by_uuid_not_by_old_slug() -> Result<()> {
        let (tree, _temp_dir) = create_test_tree().await?;
        let blog = create_blog(&tree).await?;
        let hello = tree
            .create_page(Some(&blog), NewPage::new("hello", "article").published(Some(1)))
            .await?;

        let renamed = tree.change_slug(&hello, "Hello Again", None).await?;
        assert_eq!(renamed.slug(), "hello-again");
        assert_eq!(renamed.id(), "blog/hello-again");

        let old = tree.storage(&hello)?;
        assert!(old.row(&VersionId::latest(), &tree.languages().default()).first().await?.is_none());
        let rows = old.rows(&[]).all().await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["slug"], json!("hello-again"));

        tree.invalidate_children(Some(&blog)).await;
        assert_eq!(tree.children(Some(&blog)).await?.slugs(), vec!["hello-again"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_children_order_nulls_last_then_title() -> Result<()> {
        let (tree, _temp_dir) = create_test_tree().await?;
        let blog = create_blog(&tree).await?;

        for (slug, num) in [("zeta", None), ("second", Some(2)), ("alpha", None), ("first", Some(1))] {
            tree.create_page(
                Some(&blog),
                NewPage::new(slug, "article").with_title(slug).published(num),
            )
            .await?;
        }

        tree.invalidate_children(Some(&blog)).await;
        let children = tree.children(Some(&blog)).await?;
        assert_eq!(children.slugs(), vec!["first", "second", "alpha", "zeta"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_forced_delete_cascades() -> Result<()> {
        let (tree, temp_dir) = create_test_tree().await?;
        let blog = create_blog(&tree).await?;
        let first = tree
            .create_page(Some(&blog), NewPage::new("first", "article").published(Some(1)))
            .await?;
        let article = tree
            .create_page(Some(&blog), NewPage::new("hello", "article").published(Some(2)))
            .await?;
        let third = tree
            .create_page(Some(&blog), NewPage::new("third", "article").published(Some(3)))
            .await?;

        let comment = tree
            .create_page(Some(&article), NewPage::new("nice", "comment").published(None))
            .await?;
        let draft_comment = tree
            .create_page(Some(&article), NewPage::new("pending", "comment"))
            .await?;

        let store = DirectoryAttachments::new(temp_dir.path().join("content"));
        let attachments = store.directory(&article);
        std::fs::create_dir_all(&attachments)?;
        std::fs::write(attachments.join("cover.jpg"), b"jpg")?;
        let comment_files = store.directory(&comment);
        assert!(comment_files.starts_with(&attachments));
        std::fs::create_dir_all(&comment_files)?;
        std::fs::write(comment_files.join("avatar.png"), b"png")?;

        let err = tree.delete(&article, false).await.unwrap_err();
        assert!(err.is_precondition());

        tree.delete(&article, true).await?;

        assert!(!tree.exists(&article).await?);
        assert!(!tree.exists(&comment).await?);
        assert!(!tree.exists(&draft_comment).await?);
        assert!(!attachments.join("cover.jpg").exists());
        assert!(!comment_files.join("avatar.png").exists());
        assert!(tree.find_by_uuid(article.uuid()).await.is_none());

        tree.invalidate_children(Some(&blog)).await;
        let children = tree.children(Some(&blog)).await?;
        assert_eq!(children.get(first.uuid()).and_then(Node::num), Some(1));
        assert_eq!(children.get(third.uuid()).and_then(Node::num), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_attachments_survive_renames_until_delete() -> Result<()> {
        let (tree, temp_dir) = create_test_tree().await?;
        let blog = create_blog(&tree).await?;
        let article = tree
            .create_page(Some(&blog), NewPage::new("hello", "article").published(Some(1)))
            .await?;
        let comment = tree
            .create_page(Some(&article), NewPage::new("nice", "comment").published(None))
            .await?;

        let store = DirectoryAttachments::new(temp_dir.path().join("content"));
        let article_files = store.directory(&article);
        let comment_files = store.directory(&comment);
        std::fs::create_dir_all(&comment_files)?;
        std::fs::write(article_files.join("a.pdf"), b"pdf")?;
        std::fs::write(comment_files.join("avatar.png"), b"png")?;

        let renamed_blog = tree.change_slug(&blog, "news", None).await?;
        let renamed = tree
            .children(Some(&renamed_blog))
            .await?
            .get(article.uuid())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("renamed article missing"))?;
        let renamed = tree.change_slug(&renamed, "world", None).await?;
        assert_eq!(renamed.id(), "news/world");
        assert_eq!(store.directory(&renamed), article_files);

        tree.delete(&renamed, true).await?;
        assert!(!article_files.join("a.pdf").exists());
        assert!(!comment_files.join("avatar.png").exists());
        assert!(!tree.exists(&comment).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_copy_and_move_are_unsupported() -> Result<()> {
        let (tree, _temp_dir) = create_test_tree().await?;
        let blog = create_blog(&tree).await?;
        let other = tree
            .create_page(None, NewPage::new("other", "blog").published(Some(2)))
            .await?;
        let hello = tree
            .create_page(Some(&blog), NewPage::new("hello", "article"))
            .await?;
        let before = tree.storage(&hello)?.rows(&[]).all().await?;

        assert!(tree.copy(&hello).await.unwrap_err().is_unsupported());
        assert!(tree.move_to(&hello, Some(&other)).await.unwrap_err().is_unsupported());

        assert_eq!(tree.storage(&hello)?.rows(&[]).all().await?, before);
        assert!(tree.drafts(Some(&other)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_create_is_constraint_violation() -> Result<()> {
        let (tree, _temp_dir) = create_test_tree().await?;
        let blog = create_blog(&tree).await?;
        tree.create_page(Some(&blog), NewPage::new("hello", "article"))
            .await?;

        let err = tree
            .create_page(Some(&blog), NewPage::new("hello", "article"))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation(), "got {:?}", err);

        // top-level pages share a NULL parent
        let err = tree
            .create_page(None, NewPage::new("blog", "blog"))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation(), "got {:?}", err);
        assert_eq!(tree.children_and_drafts(None).await?.slugs(), vec!["blog"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_structured_fields_are_encoded() -> Result<()> {
        let (tree, _temp_dir) = create_test_tree().await?;
        let blog = create_blog(&tree).await?;
        let fields = json!({ "text": "Body", "tags": ["rust", "sql"], "ignored": true });
        let article = tree
            .create_page(
                Some(&blog),
                NewPage::new("hello", "article")
                    .with_fields(fields.as_object().cloned().unwrap_or_default()),
            )
            .await?;

        let content = tree
            .content(&article, &VersionId::latest(), &tree.languages().default())
            .await?;
        assert_eq!(content["text"], json!("Body"));
        assert_eq!(content["tags"], json!("- rust\n- sql\n"));
        assert!(!content.contains_key("ignored"));
        Ok(())
    }
}
