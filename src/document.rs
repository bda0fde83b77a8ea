use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ids::{is_ptd_id, undraft_id};

pub const METADATA_KEY: &str = "crowdinMetadata";
pub const METADATA_TYPE: &str = "crowdin.ptd.meta";
pub const METADATA_SCHEMA_NAME: &str = "translation.metadata";
pub const TRANSLATIONS_ARRAY_NAME: &str = "translations";
pub const REFERENCE_VALUE_TYPE: &str = "internationalizedArrayReferenceValue";

/// Keys the content store manages itself; never copied between documents.
pub const SYSTEM_KEYS: [&str; 3] = ["_rev", "_createdAt", "_updatedAt"];

/// A content store record. Everything besides the identity keys lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub doc_type: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            doc_type: doc_type.into(),
            rev: None,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn crowdin_metadata(&self) -> Option<CrowdinMetadata> {
        self.fields
            .get(METADATA_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn set_crowdin_metadata(&mut self, metadata: &CrowdinMetadata) {
        self.fields
            .insert(METADATA_KEY.to_string(), metadata.to_value());
    }

    pub fn strip_system_keys(&mut self) {
        self.rev = None;
        for key in SYSTEM_KEYS {
            self.fields.remove(key);
        }
    }

    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("_id".to_string(), Value::String(self.id.clone()));
        object.insert("_type".to_string(), Value::String(self.doc_type.clone()));
        if let Some(rev) = &self.rev {
            object.insert("_rev".to_string(), Value::String(rev.clone()));
        }
        Value::Object(object)
    }
}

/// Stamped on source, target and preview documents while a Crowdin job is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdinMetadata {
    #[serde(rename = "_type", default = "default_metadata_type")]
    pub meta_type: String,
    #[serde(deserialize_with = "deserialize_file_id")]
    pub source_file_id: u64,
    pub source_doc_id: String,
}

fn default_metadata_type() -> String {
    METADATA_TYPE.to_string()
}

impl CrowdinMetadata {
    pub fn new(source_file_id: u64, source_doc_id: &str) -> Self {
        Self {
            meta_type: METADATA_TYPE.to_string(),
            source_file_id,
            source_doc_id: undraft_id(source_doc_id),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "_type": self.meta_type,
            "sourceFileId": self.source_file_id,
            "sourceDocId": self.source_doc_id,
        })
    }
}

/// Crowdin ids arrive as numbers from the UI and as strings from webhooks.
pub fn deserialize_file_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Draft and published variants of one language version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocPair {
    pub lang: String,
    #[serde(default)]
    pub draft: Option<Document>,
    #[serde(default)]
    pub published: Option<Document>,
}

impl DocPair {
    /// Weak references may resolve to nothing; such pairs are not live.
    pub fn is_live(&self) -> bool {
        self.draft.is_some() || self.published.is_some()
    }

    pub fn preferred(&self, prefer_draft: bool) -> Option<&Document> {
        if prefer_draft {
            self.draft.as_ref().or(self.published.as_ref())
        } else {
            self.published.as_ref().or(self.draft.as_ref())
        }
    }
}

/// Translation metadata document with its references already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationMetadata {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub translations: Vec<DocPair>,
}

/// Entry of the metadata document's `translations` array.
pub fn translation_reference(lang: &str, doc_id: &str, doc_type: &str) -> Value {
    serde_json::json!({
        "_key": lang.to_lowercase(),
        "_type": REFERENCE_VALUE_TYPE,
        "value": {
            "_type": "reference",
            "_ref": undraft_id(doc_id),
            "_weak": true,
            "_strengthenOnPublish": { "type": doc_type },
        },
    })
}

pub fn is_ptd_doc(doc: &Document) -> bool {
    is_ptd_id(&doc.id)
        && doc
            .crowdin_metadata()
            .map(|meta| meta.meta_type == METADATA_TYPE)
            .unwrap_or(false)
}

/// A main document either has no open job or is the job's own source.
pub fn is_main_doc(doc: &Document) -> bool {
    match doc.crowdin_metadata() {
        Some(meta) => undraft_id(&doc.id) == undraft_id(&meta.source_doc_id),
        None => true,
    }
}

/// What the editing surface knows about the document being edited.
#[derive(Debug, Clone, Default)]
pub struct EditorContext {
    pub schema_read_only: Option<bool>,
}

/// Preview documents and translation targets are owned by the sync; everything else
/// follows the schema.
pub fn is_read_only(doc: &Document, context: &EditorContext) -> bool {
    if is_ptd_id(&doc.id) || !is_main_doc(doc) {
        return true;
    }
    context.schema_read_only.unwrap_or(false)
}

/// Recursive merge: objects by key, arrays by index, `null` in the overlay keeps the base.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (_, Value::Null) => base.clone(),
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match base_map.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            let len = base_items.len().max(overlay_items.len());
            let merged = (0..len)
                .map(|i| match (base_items.get(i), overlay_items.get(i)) {
                    (Some(b), Some(o)) => deep_merge(b, o),
                    (Some(b), None) => b.clone(),
                    (None, Some(o)) => o.clone(),
                    (None, None) => Value::Null,
                })
                .collect();
            Value::Array(merged)
        }
        _ => overlay.clone(),
    }
}
