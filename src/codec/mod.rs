// Structured document <-> flat HTML codec
//
// The markup uploaded to Crowdin carries two things:
// - the original document as JSON inside a `sanity-root` script element
// - a tree of `div`s, one per translatable leaf, that translators edit
//
// Decoding rebuilds the visible tree and merges it back onto the embedded original,
// so anything the translators never saw keeps its stored value.

pub mod decode;
pub mod encode;

use serde_json::Value;
use std::collections::HashSet;

use crate::config::CodecConfig;
use crate::document::{Document, METADATA_KEY};
use crate::error::Result;

pub const ROOT_ELEMENT_ID: &str = "sanity-root";

const DEFAULT_HIDDEN_FIELDS: [&str; 9] = [
    "_id",
    "_rev",
    "_key",
    "_ref",
    "_type",
    "_createdAt",
    "_updatedAt",
    "listItem",
    "level",
];

const DEFAULT_HIDDEN_OBJECTS: [&str; 1] = [METADATA_KEY];

/// `data-type` of a visible node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HtmlCodec {
    hidden_fields: HashSet<String>,
    hidden_objects: HashSet<String>,
}

impl Default for HtmlCodec {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}

impl HtmlCodec {
    pub fn new(additional_hidden_fields: &[String], additional_hidden_objects: &[String]) -> Self {
        let hidden_fields = DEFAULT_HIDDEN_FIELDS
            .iter()
            .map(|s| s.to_string())
            .chain(additional_hidden_fields.iter().cloned())
            .collect();
        let hidden_objects = DEFAULT_HIDDEN_OBJECTS
            .iter()
            .map(|s| s.to_string())
            .chain(additional_hidden_objects.iter().cloned())
            .collect();

        Self {
            hidden_fields,
            hidden_objects,
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(&config.hidden_fields, &config.hidden_objects)
    }

    pub fn should_hide(&self, key: &str) -> bool {
        self.hidden_fields.contains(key) || self.hidden_objects.contains(key)
    }

    /// Objects whose `_type` is a hidden object type stay out of the visible tree.
    pub fn is_hidden_object(&self, value: &Value) -> bool {
        value
            .get("_type")
            .and_then(Value::as_str)
            .map(|object_type| self.hidden_objects.contains(object_type))
            .unwrap_or(false)
    }

    pub fn encode(&self, document: &Document) -> Result<String> {
        encode::document_to_html(self, document)
    }

    pub fn decode(&self, markup: &str) -> Result<Document> {
        decode::html_to_document(self, markup)
    }
}
