//! Attachments and derived media
//!
//! Pages can own attached files and a directory of derived media
//! (thumbnails and the like). Both live outside the page table; the tree
//! only needs to list and delete attachments one by one and to drop the
//! media directory when a page's path changes.

use crate::models::Node;
use crate::services::PageStoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A file attached to a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub path: PathBuf,
}

/// Lists and deletes a page's attachments
#[async_trait]
pub trait AttachmentStore: Send + Sync + std::fmt::Debug {
    async fn list(&self, node: &Node) -> Result<Vec<Attachment>, PageStoreError>;

    async fn delete(&self, attachment: &Attachment) -> Result<(), PageStoreError>;
}

/// Pages without attachments
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAttachments;

#[async_trait]
impl AttachmentStore for NoAttachments {
    async fn list(&self, _node: &Node) -> Result<Vec<Attachment>, PageStoreError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _attachment: &Attachment) -> Result<(), PageStoreError> {
        Ok(())
    }
}

/// Attachments stored as plain files in `<root>/<uuid path>/`
///
/// The uuid path nests the uuids of the ancestors, so the directory stays
/// put when the page or one of its ancestors changes its slug.
#[derive(Debug, Clone)]
pub struct DirectoryAttachments {
    root: PathBuf,
}

impl DirectoryAttachments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn directory(&self, node: &Node) -> PathBuf {
        self.root.join(node.diruri())
    }
}

#[async_trait]
impl AttachmentStore for DirectoryAttachments {
    async fn list(&self, node: &Node) -> Result<Vec<Attachment>, PageStoreError> {
        let directory = self.directory(node);
        if !directory.is_dir() {
            return Ok(Vec::new());
        }

        let mut attachments = Vec::new();
        let mut entries = tokio::fs::read_dir(&directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                attachments.push(Attachment {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    path: entry.path(),
                });
            }
        }
        attachments.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(attachments)
    }

    async fn delete(&self, attachment: &Attachment) -> Result<(), PageStoreError> {
        match tokio::fs::remove_file(&attachment.path).await {
            Ok(()) => {
                tracing::debug!("Deleted attachment {}", attachment.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Removes a page's derived media
#[async_trait]
pub trait MediaStore: Send + Sync + std::fmt::Debug {
    async fn remove(&self, node: &Node) -> Result<(), PageStoreError>;
}

/// No derived media
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMedia;

#[async_trait]
impl MediaStore for NoMedia {
    async fn remove(&self, _node: &Node) -> Result<(), PageStoreError> {
        Ok(())
    }
}

/// Derived media in `<root>/pages/<page id>/`
#[derive(Debug, Clone)]
pub struct MediaDirectory {
    root: PathBuf,
}

impl MediaDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn directory(&self, node: &Node) -> PathBuf {
        self.root.join("pages").join(node.id())
    }
}

#[async_trait]
impl MediaStore for MediaDirectory {
    async fn remove(&self, node: &Node) -> Result<(), PageStoreError> {
        match tokio::fs::remove_dir_all(self.directory(node)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
