//! Relational storage adapter
//!
//! [`DatabaseStorage`] binds one page to the table of its kind. Every
//! (version, language) pair of the page is one row. Two ways of finding
//! rows exist:
//!
//! - [`row`](DatabaseStorage::row) matches the language slug, version,
//!   language and parent. Content reads and writes go through it.
//! - [`rows`](DatabaseStorage::rows) matches uuid and parent plus extra
//!   filters. Administrative updates (slug, num, draft) go through it since
//!   they must find rows whose slug is about to change.

use crate::db::{ConnectionResolver, DatabaseService, Fields};
use crate::models::{Language, ModelDescriptor, Node, VersionId};
use crate::services::PageStoreError;
use crate::storage::{RowCodec, Storage, TableQuery};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Timestamp format of SQLite's `CURRENT_TIMESTAMP`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage adapter keeping one page's content in table rows
#[derive(Debug, Clone)]
pub struct DatabaseStorage {
    node: Node,
    descriptor: Arc<ModelDescriptor>,
    db: DatabaseService,
    codec: RowCodec,
}

impl DatabaseStorage {
    pub fn new(
        node: Node,
        descriptor: Arc<ModelDescriptor>,
        db: DatabaseService,
        codec: RowCodec,
    ) -> Self {
        Self {
            node,
            descriptor,
            db,
            codec,
        }
    }

    /// Resolve the handle for the node's kind once and bind the adapter
    pub fn resolve(
        node: Node,
        descriptor: Arc<ModelDescriptor>,
        resolver: &ConnectionResolver,
        codec: RowCodec,
    ) -> Result<Self, PageStoreError> {
        let db = resolver.resolve_for_model(&descriptor)?;
        Ok(Self::new(node, descriptor, db, codec))
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// The whole table of the node's kind
    pub fn table(&self) -> TableQuery {
        TableQuery::new(self.db.clone(), self.descriptor.table.clone())
    }

    fn parent_value(&self) -> Value {
        self.node
            .parent_uuid()
            .map(|uuid| Value::String(uuid.to_string()))
            .unwrap_or(Value::Null)
    }

    /// The row of one (version, language) slot, located by slug
    pub fn row(&self, version: &VersionId, language: &Language) -> TableQuery {
        self.table()
            .filter("slug", self.node.slug_for(language.code()))
            .filter("version", version.value())
            .filter("language", language.code())
            .filter("parent", self.parent_value())
    }

    /// Every row of the node located by uuid, narrowed by `extra`
    pub fn rows(&self, extra: &[(&str, Value)]) -> TableQuery {
        let mut query = self
            .table()
            .filter("uuid", self.node.uuid())
            .filter("parent", self.parent_value());
        for (column, value) in extra {
            query = query.filter(*column, value.clone());
        }
        query
    }

    /// Whether both slots are the same row
    ///
    /// Missing targets default to the source slot and to this adapter. The
    /// answer is false when the target is not relational or either row is
    /// absent.
    pub async fn is_same_storage_location(
        &self,
        from_version: &VersionId,
        from_language: &Language,
        to_version: Option<&VersionId>,
        to_language: Option<&Language>,
        to_storage: Option<&dyn Storage>,
    ) -> Result<bool, PageStoreError> {
        let target = match to_storage {
            Some(storage) => match storage.as_database() {
                Some(database) => database,
                None => return Ok(false),
            },
            None => self,
        };

        let to_version = to_version.unwrap_or(from_version);
        let to_language = to_language.unwrap_or(from_language);

        let from = self.row(from_version, from_language).first().await?;
        let to = target.row(to_version, to_language).first().await?;

        Ok(match (from, to) {
            (Some(from), Some(to)) => match (from.get("id"), to.get("id")) {
                (Some(a), Some(b)) => !a.is_null() && a == b,
                _ => false,
            },
            _ => false,
        })
    }

    /// Copy one slot's content into another
    ///
    /// Writes the target when it exists, creates it otherwise. Nothing
    /// happens when the source is absent or both slots are the same row.
    pub async fn copy_content(
        &self,
        from_version: &VersionId,
        from_language: &Language,
        to_version: &VersionId,
        to_language: &Language,
    ) -> Result<(), PageStoreError> {
        if self
            .is_same_storage_location(
                from_version,
                from_language,
                Some(to_version),
                Some(to_language),
                None,
            )
            .await?
        {
            return Ok(());
        }

        let mut content = self.read(from_version, from_language).await?;
        content.remove("slug");
        if content.is_empty() {
            return Ok(());
        }

        if self.exists(to_version, to_language).await? {
            self.write(to_version, to_language, &content).await
        } else {
            self.create(to_version, to_language, &content).await
        }
    }

    /// Copy one slot's content into another and delete the source
    pub async fn move_content(
        &self,
        from_version: &VersionId,
        from_language: &Language,
        to_version: &VersionId,
        to_language: &Language,
    ) -> Result<(), PageStoreError> {
        if self
            .is_same_storage_location(
                from_version,
                from_language,
                Some(to_version),
                Some(to_language),
                None,
            )
            .await?
        {
            return Ok(());
        }

        self.copy_content(from_version, from_language, to_version, to_language)
            .await?;
        self.delete(from_version, from_language).await
    }
}

fn now() -> Value {
    Value::String(Utc::now().format(TIMESTAMP_FORMAT).to_string())
}

/// Parse a `modified` column into unix seconds; 0 when unparseable
pub(crate) fn parse_timestamp(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
                naive.and_utc().timestamp()
            } else if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                parsed.timestamp()
            } else {
                s.parse().unwrap_or(0)
            }
        }
        _ => 0,
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn create(
        &self,
        version: &VersionId,
        language: &Language,
        fields: &Fields,
    ) -> Result<(), PageStoreError> {
        let mut row = self.codec.encode(fields, &self.descriptor)?;

        let title = match row.get("title") {
            Some(title) if !title.is_null() => title.clone(),
            _ => self
                .node
                .title()
                .map(|t| Value::String(t.to_string()))
                .unwrap_or(Value::Null),
        };

        row.insert("slug".into(), self.node.slug_for(language.code()).into());
        row.insert("title".into(), title);
        row.insert("version".into(), version.value().into());
        row.insert("language".into(), language.code().into());
        row.insert("uuid".into(), self.node.uuid().into());
        row.insert("parent".into(), self.parent_value());
        row.insert("template".into(), self.node.template().into());
        row.insert(
            "num".into(),
            self.node.num().map(Value::from).unwrap_or(Value::Null),
        );
        row.insert("draft".into(), i64::from(self.node.is_draft()).into());

        let id = self.table().insert(&row).await?;
        tracing::debug!(
            "Created row {} for {} ({} / {})",
            id,
            self.node.id(),
            version,
            language.code()
        );
        Ok(())
    }

    async fn read(
        &self,
        version: &VersionId,
        language: &Language,
    ) -> Result<Fields, PageStoreError> {
        Ok(self
            .row(version, language)
            .first()
            .await?
            .unwrap_or_default())
    }

    async fn write(
        &self,
        version: &VersionId,
        language: &Language,
        fields: &Fields,
    ) -> Result<(), PageStoreError> {
        let mut row = self.codec.encode(fields, &self.descriptor)?;
        row.insert("modified".into(), now());

        let affected = self.row(version, language).update(&row).await?;
        if affected == 0 {
            tracing::debug!(
                "No row to write for {} ({} / {})",
                self.node.id(),
                version,
                language.code()
            );
        }
        Ok(())
    }

    async fn delete(&self, version: &VersionId, language: &Language) -> Result<(), PageStoreError> {
        self.row(version, language).delete().await?;
        Ok(())
    }

    async fn exists(&self, version: &VersionId, language: &Language) -> Result<bool, PageStoreError> {
        Ok(self.row(version, language).first().await?.is_some())
    }

    async fn touch(&self, version: &VersionId, language: &Language) -> Result<(), PageStoreError> {
        let mut row = Fields::new();
        row.insert("modified".into(), now());
        self.row(version, language).update(&row).await?;
        Ok(())
    }

    async fn modified(
        &self,
        version: &VersionId,
        language: &Language,
    ) -> Result<i64, PageStoreError> {
        let row = self.row(version, language).first().await?;
        Ok(row.map_or(0, |row| parse_timestamp(row.get("modified"))))
    }

    fn as_database(&self) -> Option<&DatabaseStorage> {
        Some(self)
    }
}
