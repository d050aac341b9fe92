//! Row Field Codec
//!
//! Filters incoming field maps down to the columns a node kind accepts and
//! turns structured values into text before they reach a row.

use crate::db::Fields;
use crate::models::ModelDescriptor;
use crate::services::PageStoreError;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

/// Administrative columns writable through the codec
pub const WRITABLE_ADMIN_FIELDS: [&str; 3] = ["title", "slug", "lock"];

/// Text encoding for structured field values
pub trait FieldEncoder: Send + Sync + Debug {
    fn encode(&self, value: &Value) -> Result<String, PageStoreError>;

    fn decode(&self, text: &str) -> Result<Value, PageStoreError>;
}

/// YAML encoding (the default)
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlEncoder;

impl FieldEncoder for YamlEncoder {
    fn encode(&self, value: &Value) -> Result<String, PageStoreError> {
        serde_yaml::to_string(value).map_err(|e| {
            PageStoreError::serialization(format!("Failed to encode field as YAML: {}", e))
        })
    }

    fn decode(&self, text: &str) -> Result<Value, PageStoreError> {
        serde_yaml::from_str(text).map_err(|e| {
            PageStoreError::serialization(format!("Failed to decode YAML field: {}", e))
        })
    }
}

/// Allowlist filter + structured value encoder
#[derive(Debug, Clone)]
pub struct RowCodec {
    encoder: Arc<dyn FieldEncoder>,
}

impl Default for RowCodec {
    fn default() -> Self {
        Self::new(Arc::new(YamlEncoder))
    }
}

impl RowCodec {
    pub fn new(encoder: Arc<dyn FieldEncoder>) -> Self {
        Self { encoder }
    }

    /// Columns accepted for `descriptor`: its custom fields plus title, slug, lock
    pub fn accept(descriptor: &ModelDescriptor) -> BTreeSet<String> {
        descriptor
            .fields
            .iter()
            .cloned()
            .chain(WRITABLE_ADMIN_FIELDS.iter().map(|f| f.to_string()))
            .collect()
    }

    /// Keep accepted keys, encode arrays and objects, pass scalars through
    ///
    /// Unknown keys are dropped silently.
    pub fn encode(
        &self,
        fields: &Fields,
        descriptor: &ModelDescriptor,
    ) -> Result<Fields, PageStoreError> {
        let accept = Self::accept(descriptor);
        let mut encoded = Fields::new();

        for (key, value) in fields {
            if !accept.contains(key) {
                continue;
            }
            let value = match value {
                Value::Array(_) | Value::Object(_) => Value::String(self.encoder.encode(value)?),
                scalar => scalar.clone(),
            };
            encoded.insert(key.clone(), value);
        }

        Ok(encoded)
    }

    /// Decode a previously encoded structured value
    pub fn decode(&self, text: &str) -> Result<Value, PageStoreError> {
        self.encoder.decode(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("article", "articles").with_fields(["text", "tags", "meta"])
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_accept_includes_admin_fields() {
        let accept = RowCodec::accept(&descriptor());
        for field in ["text", "tags", "meta", "title", "slug", "lock"] {
            assert!(accept.contains(field), "missing {}", field);
        }
        assert!(!accept.contains("num"));
        assert!(!accept.contains("draft"));
    }

    #[test]
    fn test_encode_drops_unknown_keys() {
        let codec = RowCodec::default();
        let encoded = codec
            .encode(
                &fields(json!({ "title": "Hi", "text": "Body", "draft": 0, "unknown": "x" })),
                &descriptor(),
            )
            .unwrap();

        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded["title"], json!("Hi"));
        assert_eq!(encoded["text"], json!("Body"));
    }

    #[test]
    fn test_encode_serializes_structured_values() {
        let codec = RowCodec::default();
        let encoded = codec
            .encode(
                &fields(json!({ "tags": ["a", "b"], "meta": { "k": 1 }, "text": 5 })),
                &descriptor(),
            )
            .unwrap();

        assert_eq!(encoded["tags"], json!("- a\n- b\n"));
        assert_eq!(encoded["text"], json!(5));

        let meta = encoded["meta"].as_str().unwrap();
        assert_eq!(codec.decode(meta).unwrap(), json!({ "k": 1 }));
    }
}
