use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::Document;

/// One staged write. Serializes to the content store's mutation format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutation {
    Create(Document),
    CreateOrReplace(Document),
    Patch(Patch),
    Delete { id: String },
}

impl Mutation {
    pub fn target_id(&self) -> &str {
        match self {
            Self::Create(doc) | Self::CreateOrReplace(doc) => &doc.id,
            Self::Patch(patch) => &patch.id,
            Self::Delete { id } => id,
        }
    }
}

/// Partial update applied in the order set, unset, insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Patch {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unset: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert: Option<Insert>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    pub items: Vec<Value>,
}

impl Patch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn unset<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unset.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn insert_after(mut self, selector: impl Into<String>, items: Vec<Value>) -> Self {
        self.insert = Some(Insert {
            before: None,
            after: Some(selector.into()),
            items,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Sync,
    Async,
    Deferred,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
            Self::Deferred => "deferred",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommitOptions {
    pub visibility: Visibility,
    pub return_documents: bool,
}

impl CommitOptions {
    pub fn returning_documents() -> Self {
        Self {
            visibility: Visibility::Sync,
            return_documents: true,
        }
    }

    pub fn asynchronous() -> Self {
        Self {
            visibility: Visibility::Async,
            return_documents: true,
        }
    }
}

/// Unit of work: mutations staged here are committed together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transaction {
    mutations: Vec<Mutation>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, document: Document) -> &mut Self {
        self.mutations.push(Mutation::Create(document));
        self
    }

    pub fn create_or_replace(&mut self, document: Document) -> &mut Self {
        self.mutations.push(Mutation::CreateOrReplace(document));
        self
    }

    pub fn patch(&mut self, patch: Patch) -> &mut Self {
        self.mutations.push(Mutation::Patch(patch));
        self
    }

    pub fn delete(&mut self, id: impl Into<String>) -> &mut Self {
        self.mutations.push(Mutation::Delete { id: id.into() });
        self
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }
}
