//! Page Tree
//!
//! [`PageTree`] ties the pieces together: the connection resolver, the
//! registered node kinds, the caches, the memoized child collections and the
//! collaborators for attachments, media and commit hooks. Lifecycle
//! operations are implemented on it in [`crate::operations`].
//!
//! # Examples
//!
//! ```no_run
//! use rowpages_core::db::{ConnectionResolver, DatabaseService};
//! use rowpages_core::models::{Languages, ModelDescriptor, ModelRegistry, NewPage};
//! use rowpages_core::services::PageTree;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = DatabaseService::new(PathBuf::from("./data/content.db")).await?;
//!     let registry = ModelRegistry::new()
//!         .register(ModelDescriptor::new("article", "articles").with_database("main"))
//!         .with_root_model("article");
//!
//!     let tree = PageTree::new(
//!         ConnectionResolver::new().with("main", db),
//!         registry,
//!         Languages::single("en"),
//!     )?;
//!
//!     let page = tree.create_page(None, NewPage::new("hello", "article")).await?;
//!     let page = tree.publish(&page).await?;
//!     tree.change_num(&page, Some(1)).await?;
//!     Ok(())
//! }
//! ```

use crate::config::StoreConfig;
use crate::db::{ConnectionResolver, Fields};
use crate::models::{
    slug, Language, Languages, ModelDescriptor, ModelRegistry, NewPage, Node, Pages, ParentRef,
    VersionId,
};
use crate::operations::{CommitHooks, NoopHooks};
use crate::services::{
    AttachmentStore, ChildCollections, ChildView, ChildrenLoader, DirectoryAttachments,
    IdentityCache, MediaDirectory, MediaStore, NoAttachments, NoMedia, NodeFactory,
    PageStoreError, VersionCache,
};
use crate::storage::{DatabaseStorage, FieldEncoder, RowCodec, Storage};
use std::sync::Arc;

/// A tree of pages stored in table rows
#[derive(Debug, Clone)]
pub struct PageTree {
    pub(crate) resolver: ConnectionResolver,
    pub(crate) registry: ModelRegistry,
    pub(crate) languages: Languages,
    pub(crate) identity: IdentityCache,
    pub(crate) versions: VersionCache,
    pub(crate) collections: ChildCollections,
    pub(crate) loader: ChildrenLoader,
    pub(crate) codec: RowCodec,
    pub(crate) attachments: Arc<dyn AttachmentStore>,
    pub(crate) media: Arc<dyn MediaStore>,
    pub(crate) hooks: Arc<dyn CommitHooks>,
}

impl PageTree {
    /// Build a tree after validating every registered node kind
    ///
    /// # Errors
    ///
    /// `Configuration` when a kind declares an invalid table or field name,
    /// an unknown child kind, or a database the resolver does not know.
    pub fn new(
        resolver: ConnectionResolver,
        registry: ModelRegistry,
        languages: Languages,
    ) -> Result<Self, PageStoreError> {
        registry.validate(&resolver)?;

        let identity = IdentityCache::new();
        let versions = VersionCache::new();
        let factory = NodeFactory::new(identity.clone(), versions.clone(), languages.default());
        let loader = ChildrenLoader::new(resolver.clone(), factory, languages.clone());

        Ok(Self {
            resolver,
            registry,
            languages,
            identity,
            versions,
            collections: ChildCollections::new(),
            loader,
            codec: RowCodec::default(),
            attachments: Arc::new(NoAttachments),
            media: Arc::new(NoMedia),
            hooks: Arc::new(NoopHooks),
        })
    }

    /// Open the configured databases and build the tree
    ///
    /// `content_root` enables attachments, `media_root` enables derived
    /// media cleanup.
    pub async fn from_config(
        config: &StoreConfig,
        registry: ModelRegistry,
    ) -> Result<Self, PageStoreError> {
        let resolver = ConnectionResolver::from_config(config).await?;
        let mut tree = Self::new(resolver, registry, config.languages())?;

        if let Some(root) = &config.content_root {
            tree = tree.with_attachments(Arc::new(DirectoryAttachments::new(root.clone())));
        }
        if let Some(root) = &config.media_root {
            tree = tree.with_media(Arc::new(MediaDirectory::new(root.clone())));
        }

        Ok(tree)
    }

    pub fn with_attachments(mut self, attachments: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_media(mut self, media: Arc<dyn MediaStore>) -> Self {
        self.media = media;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn CommitHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the structured value encoding (YAML by default)
    pub fn with_encoder(mut self, encoder: Arc<dyn FieldEncoder>) -> Self {
        self.codec = RowCodec::new(encoder);
        self
    }

    pub fn languages(&self) -> &Languages {
        &self.languages
    }

    pub fn identity(&self) -> &IdentityCache {
        &self.identity
    }

    pub fn versions(&self) -> &VersionCache {
        &self.versions
    }

    pub fn descriptor(&self, node: &Node) -> Result<Arc<ModelDescriptor>, PageStoreError> {
        self.registry.get(node.kind())
    }

    /// Descriptor of the children of `parent` (`None` for the top)
    pub fn child_descriptor(
        &self,
        parent: Option<&Node>,
    ) -> Result<Arc<ModelDescriptor>, PageStoreError> {
        match parent {
            Some(parent) => self.registry.child_of(parent.kind()),
            None => self.registry.root(),
        }
    }

    /// Storage adapter bound to `node`
    pub fn storage(&self, node: &Node) -> Result<DatabaseStorage, PageStoreError> {
        DatabaseStorage::resolve(
            node.clone(),
            self.descriptor(node)?,
            &self.resolver,
            self.codec.clone(),
        )
    }

    /// Whether any row of the node exists, regardless of slug
    pub async fn exists(&self, node: &Node) -> Result<bool, PageStoreError> {
        Ok(self.storage(node)?.rows(&[]).first().await?.is_some())
    }

    pub async fn find_by_uuid(&self, uuid: &str) -> Option<Node> {
        self.identity.lookup(uuid).await
    }

    /// Published children of `parent`, memoized
    pub async fn children(&self, parent: Option<&Node>) -> Result<Pages, PageStoreError> {
        self.view(parent, ChildView::Children).await
    }

    /// Draft children of `parent`, memoized
    pub async fn drafts(&self, parent: Option<&Node>) -> Result<Pages, PageStoreError> {
        self.view(parent, ChildView::Drafts).await
    }

    /// Published children followed by drafts, memoized
    pub async fn children_and_drafts(&self, parent: Option<&Node>) -> Result<Pages, PageStoreError> {
        self.view(parent, ChildView::Combined).await
    }

    /// Forget the memoized collections of `parent`
    pub async fn invalidate_children(&self, parent: Option<&Node>) {
        self.collections.invalidate(parent.map(Node::uuid)).await;
    }

    /// Published pages next to `node`, including `node` itself if listed
    pub async fn siblings(&self, node: &Node) -> Result<Pages, PageStoreError> {
        let descriptor = self.descriptor(node)?;
        self.collection(node.parent(), &descriptor, ChildView::Children)
            .await
    }

    async fn view(&self, parent: Option<&Node>, view: ChildView) -> Result<Pages, PageStoreError> {
        let descriptor = self.child_descriptor(parent)?;
        let parent_ref = parent.map(Node::as_parent);
        self.collection(parent_ref.as_ref(), &descriptor, view).await
    }

    /// Memoized collection below `parent`, loading it on first use
    pub(crate) async fn collection(
        &self,
        parent: Option<&ParentRef>,
        descriptor: &ModelDescriptor,
        view: ChildView,
    ) -> Result<Pages, PageStoreError> {
        match view {
            ChildView::Children => self.loaded(parent, descriptor, false).await,
            ChildView::Drafts => self.loaded(parent, descriptor, true).await,
            ChildView::Combined => {
                let key = parent.map(|p| p.uuid.as_str());
                if let Some(pages) = self.collections.get(key, view).await {
                    return Ok(pages);
                }

                let children = self.loaded(parent, descriptor, false).await?;
                let drafts = self.loaded(parent, descriptor, true).await?;
                let pages: Pages = children.into_vec().into_iter().chain(drafts.into_vec()).collect();

                self.collections.store(key, view, pages.clone()).await;
                Ok(pages)
            }
        }
    }

    async fn loaded(
        &self,
        parent: Option<&ParentRef>,
        descriptor: &ModelDescriptor,
        draft: bool,
    ) -> Result<Pages, PageStoreError> {
        let key = parent.map(|p| p.uuid.as_str());
        let view = if draft { ChildView::Drafts } else { ChildView::Children };
        if let Some(pages) = self.collections.get(key, view).await {
            return Ok(pages);
        }

        let pages = self.loader.from_rows(parent, descriptor, draft).await?;
        self.collections.store(key, view, pages.clone()).await;
        Ok(pages)
    }

    /// Children and drafts of `node`, empty when its kind has no children
    pub(crate) async fn descendants(&self, node: &Node) -> Result<Pages, PageStoreError> {
        if self.descriptor(node)?.child_model.is_none() {
            return Ok(Pages::new());
        }
        self.children_and_drafts(Some(node)).await
    }

    /// Create a page below `parent` (`None` for the top)
    ///
    /// The default-language `latest` row is inserted; the new page is added
    /// to the loaded collections of its parent.
    pub async fn create_page(
        &self,
        parent: Option<&Node>,
        page: NewPage,
    ) -> Result<Node, PageStoreError> {
        let descriptor = self.child_descriptor(parent)?;

        let slug = slug::normalize(&page.slug);
        if slug.is_empty() {
            return Err(PageStoreError::precondition(format!(
                "'{}' is not a valid slug",
                page.slug
            )));
        }
        if !page.draft && page.num.is_some_and(|num| num < 0) {
            return Err(PageStoreError::precondition(
                "The sorting number must not be negative",
            ));
        }

        let mut node = Node::new(descriptor.kind.clone(), slug, page.template)
            .with_parent(parent.map(Node::as_parent))
            .with_draft(page.draft)
            .with_num(if page.draft { None } else { page.num });
        if let Some(uuid) = page.uuid {
            node = node.with_uuid(uuid);
        }
        if let Some(title) = page.title {
            node = node.with_title(title);
        }

        let storage = DatabaseStorage::resolve(
            node.clone(),
            descriptor,
            &self.resolver,
            self.codec.clone(),
        )?;
        storage
            .create(&VersionId::latest(), &self.languages.default(), &page.fields)
            .await?;

        self.identity.register(&node).await;
        let parent_uuid = node.parent_uuid();
        self.collections
            .append_node(parent_uuid, ChildView::of(&node), &node)
            .await;
        self.collections
            .append_node(parent_uuid, ChildView::Combined, &node)
            .await;

        tracing::info!("Created page {} ({:?})", node.id(), node.status());
        Ok(node)
    }

    /// Content of one slot, served from the version cache when possible
    pub async fn content(
        &self,
        node: &Node,
        version: &VersionId,
        language: &Language,
    ) -> Result<Fields, PageStoreError> {
        if let Some(fields) = self.versions.get(node.uuid(), version, language).await {
            return Ok(fields);
        }

        let fields = self.storage(node)?.read(version, language).await?;
        if !fields.is_empty() {
            self.versions
                .set(node.uuid(), version, language, fields.clone())
                .await;
        }
        Ok(fields)
    }

    /// Write one slot, creating it when absent
    pub async fn save_content(
        &self,
        node: &Node,
        version: &VersionId,
        language: &Language,
        fields: &Fields,
    ) -> Result<(), PageStoreError> {
        let storage = self.storage(node)?;
        if storage.exists(version, language).await? {
            storage.write(version, language, fields).await?;
        } else {
            storage.create(version, language, fields).await?;
        }
        self.versions.remove(node.uuid(), version, language).await;
        Ok(())
    }
}
