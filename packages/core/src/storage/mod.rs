//! Page content storage
//!
//! A [`Storage`] reads and writes the content of one page, addressed by
//! version and language. [`DatabaseStorage`] keeps that content in table
//! rows; [`ContentSnapshot`] is the read-only copy taken before a delete.

mod codec;
mod database_storage;
mod query;
mod snapshot;

pub use codec::{FieldEncoder, RowCodec, YamlEncoder, WRITABLE_ADMIN_FIELDS};
pub use database_storage::DatabaseStorage;
pub use query::{TableQuery, SIBLING_ORDER};
pub use snapshot::ContentSnapshot;

use crate::db::Fields;
use crate::models::{Language, VersionId};
use crate::services::PageStoreError;
use async_trait::async_trait;

/// Content storage of one page
///
/// Absence is never an error: `read` returns an empty map, `write`,
/// `touch` and `delete` do nothing, `modified` returns 0.
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Create the content slot for `version` and `language`
    async fn create(
        &self,
        version: &VersionId,
        language: &Language,
        fields: &Fields,
    ) -> Result<(), PageStoreError>;

    /// Full content of the slot, empty if absent
    async fn read(&self, version: &VersionId, language: &Language)
        -> Result<Fields, PageStoreError>;

    /// Update the slot if it exists
    async fn write(
        &self,
        version: &VersionId,
        language: &Language,
        fields: &Fields,
    ) -> Result<(), PageStoreError>;

    async fn delete(&self, version: &VersionId, language: &Language) -> Result<(), PageStoreError>;

    async fn exists(&self, version: &VersionId, language: &Language) -> Result<bool, PageStoreError>;

    /// Refresh only the modification time
    async fn touch(&self, version: &VersionId, language: &Language) -> Result<(), PageStoreError>;

    /// Modification time in unix seconds, 0 if absent
    async fn modified(&self, version: &VersionId, language: &Language)
        -> Result<i64, PageStoreError>;

    /// Downcast to the relational adapter
    fn as_database(&self) -> Option<&DatabaseStorage> {
        None
    }
}
