//! Read-only copy of a page's rows
//!
//! A delete captures every row of the page before anything is removed, so
//! commit hooks can still read what was deleted.

use crate::db::Fields;
use crate::models::{Language, VersionId};
use crate::services::PageStoreError;
use crate::storage::database_storage::parse_timestamp;
use crate::storage::{DatabaseStorage, Storage};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Every row of one page, keyed by (version, language)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentSnapshot {
    rows: BTreeMap<(String, String), Fields>,
}

impl ContentSnapshot {
    /// Read all rows of the adapter's page
    pub async fn capture(storage: &DatabaseStorage) -> Result<Self, PageStoreError> {
        let mut rows = BTreeMap::new();
        for row in storage.rows(&[]).all().await? {
            let version = text(&row, "version");
            let language = text(&row, "language");
            rows.insert((version, language), row);
        }
        Ok(Self { rows })
    }

    pub fn get(&self, version: &VersionId, language: &Language) -> Option<&Fields> {
        self.rows
            .get(&(version.value().to_string(), language.code().to_string()))
    }

    /// Captured (version, language) pairs
    pub fn slots(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows.keys().map(|(v, l)| (v.as_str(), l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn immutable() -> PageStoreError {
        PageStoreError::precondition("A content snapshot is immutable")
    }
}

fn text(row: &Fields, column: &str) -> String {
    row.get(column)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl Storage for ContentSnapshot {
    async fn create(
        &self,
        _version: &VersionId,
        _language: &Language,
        _fields: &Fields,
    ) -> Result<(), PageStoreError> {
        Err(Self::immutable())
    }

    async fn read(
        &self,
        version: &VersionId,
        language: &Language,
    ) -> Result<Fields, PageStoreError> {
        Ok(self.get(version, language).cloned().unwrap_or_default())
    }

    async fn write(
        &self,
        _version: &VersionId,
        _language: &Language,
        _fields: &Fields,
    ) -> Result<(), PageStoreError> {
        Err(Self::immutable())
    }

    async fn delete(&self, _version: &VersionId, _language: &Language) -> Result<(), PageStoreError> {
        Err(Self::immutable())
    }

    async fn exists(&self, version: &VersionId, language: &Language) -> Result<bool, PageStoreError> {
        Ok(self.get(version, language).is_some())
    }

    async fn touch(&self, _version: &VersionId, _language: &Language) -> Result<(), PageStoreError> {
        Err(Self::immutable())
    }

    async fn modified(
        &self,
        version: &VersionId,
        language: &Language,
    ) -> Result<i64, PageStoreError> {
        Ok(self
            .get(version, language)
            .map_or(0, |row| parse_timestamp(row.get("modified"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_table;
    use crate::db::DatabaseService;
    use crate::models::{ModelDescriptor, Node};
    use crate::storage::RowCodec;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_capture_survives_delete() {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        create_table(&db, "pages", &["text".to_string()]).await.unwrap();

        let storage = DatabaseStorage::new(
            Node::new("page", "about", "default"),
            Arc::new(ModelDescriptor::new("page", "pages").with_fields(["text"])),
            db,
            RowCodec::default(),
        );
        let en = Language::new("en", true);
        let de = Language::new("de", false);
        let latest = VersionId::latest();
        let text = json!({ "text": "Hi" }).as_object().cloned().unwrap();
        storage.create(&latest, &en, &text).await.unwrap();
        storage.create(&latest, &de, &Fields::new()).await.unwrap();

        let snapshot = ContentSnapshot::capture(&storage).await.unwrap();
        storage.delete(&latest, &en).await.unwrap();
        storage.delete(&latest, &de).await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.exists(&latest, &de).await.unwrap());
        assert_eq!(snapshot.read(&latest, &en).await.unwrap()["text"], json!("Hi"));
        assert!(snapshot.modified(&latest, &en).await.unwrap() > 0);
        assert!(snapshot
            .write(&latest, &en, &Fields::new())
            .await
            .unwrap_err()
            .is_precondition());
    }
}
