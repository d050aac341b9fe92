//! Page Tree Services
//!
//! This module contains the services around the storage adapter:
//!
//! - `PageTree` - entry point holding the resolver, registry, caches and collaborators
//! - `NodeFactory` - hydrates nodes from rows and seeds the caches
//! - `ChildrenLoader` / `ChildCollections` - ordered, memoized child listings
//! - `IdentityCache` / `VersionCache` - uuid lookup and content cache
//! - `AttachmentStore` / `MediaStore` - files owned by a page
//!
//! Lifecycle operations on the tree live in [`crate::operations`].

mod children;
pub mod error;
mod files;
mod identity_cache;
mod node_factory;
mod page_tree;
mod version_cache;

pub use children::{ChildCollections, ChildView, ChildrenLoader};
pub use error::PageStoreError;
pub use files::{
    Attachment, AttachmentStore, DirectoryAttachments, MediaDirectory, MediaStore, NoAttachments,
    NoMedia,
};
pub use identity_cache::IdentityCache;
pub use node_factory::NodeFactory;
pub use page_tree::PageTree;
pub use version_cache::VersionCache;
