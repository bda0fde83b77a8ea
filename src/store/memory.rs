use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

use super::{CommitOptions, ContentStore, Insert, Mutation, Patch, Transaction};
use crate::document::{
    DocPair, Document, TranslationMetadata, METADATA_SCHEMA_NAME, TRANSLATIONS_ARRAY_NAME,
};
use crate::error::{Result, SyncError};
use crate::ids::{draft_id, undraft_id};

/// Documents kept in process memory. Commits are applied to a copy and swapped in
/// only when every mutation succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<I: IntoIterator<Item = Document>>(documents: I) -> Self {
        let store = Self::new();
        for document in documents {
            store.insert(document);
        }
        store
    }

    /// Seed a document directly, bypassing transactions.
    pub fn insert(&self, mut document: Document) {
        stamp_revision(&mut document);
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(document.id.clone(), document);
        }
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.lock().ok()?.get(id).cloned()
    }

    pub fn all(&self) -> Vec<Document> {
        self.documents
            .lock()
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Document>>> {
        self.documents
            .lock()
            .map_err(|e| SyncError::Store(format!("memory store poisoned: {}", e)))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn find_translation_metadata(&self, published_id: &str) -> Result<Option<TranslationMetadata>> {
        let documents = self.lock()?;
        let metadata = documents.values().find(|doc| {
            doc.doc_type == METADATA_SCHEMA_NAME
                && translation_entries(doc)
                    .iter()
                    .any(|entry| entry_ref(entry) == Some(published_id))
        });

        let Some(metadata) = metadata else {
            return Ok(None);
        };

        let translations = translation_entries(metadata)
            .iter()
            .map(|entry| {
                let reference = entry_ref(entry).unwrap_or_default();
                DocPair {
                    lang: entry
                        .get("_key")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    published: documents.get(reference).cloned(),
                    draft: documents.get(&draft_id(reference)).cloned(),
                }
            })
            .collect();

        Ok(Some(TranslationMetadata {
            id: metadata.id.clone(),
            translations,
        }))
    }

    async fn find_by_source_file_id(&self, source_file_id: u64) -> Result<Vec<Document>> {
        Ok(self
            .lock()?
            .values()
            .filter(|doc| {
                doc.crowdin_metadata()
                    .map(|meta| meta.source_file_id == source_file_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn find_target_documents(
        &self,
        source_doc_id: &str,
        language_field: &str,
        lang: &str,
    ) -> Result<Vec<Document>> {
        Ok(self
            .lock()?
            .values()
            .filter(|doc| {
                undraft_id(&doc.id) != undraft_id(source_doc_id)
                    && doc.str_field(language_field) == Some(lang)
                    && doc
                        .crowdin_metadata()
                        .map(|meta| meta.source_doc_id == source_doc_id)
                        .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn commit(&self, transaction: Transaction, options: CommitOptions) -> Result<Vec<Document>> {
        let mut documents = self.lock()?;
        let mut staged = documents.clone();
        let mut touched: Vec<String> = Vec::new();

        for mutation in transaction.mutations() {
            apply_mutation(&mut staged, mutation)?;
            let id = mutation.target_id().to_string();
            if !touched.contains(&id) {
                touched.push(id);
            }
        }

        debug!(
            "Committing {} mutations ({} visibility)",
            transaction.len(),
            options.visibility.as_str()
        );
        *documents = staged;

        if !options.return_documents {
            return Ok(Vec::new());
        }
        Ok(touched
            .iter()
            .filter_map(|id| documents.get(id).cloned())
            .collect())
    }
}

fn stamp_revision(document: &mut Document) {
    let now = Utc::now().to_rfc3339();
    document.rev = Some(uuid::Uuid::new_v4().simple().to_string());
    document
        .fields
        .entry("_createdAt".to_string())
        .or_insert_with(|| Value::String(now.clone()));
    document
        .fields
        .insert("_updatedAt".to_string(), Value::String(now));
}

fn apply_mutation(documents: &mut BTreeMap<String, Document>, mutation: &Mutation) -> Result<()> {
    match mutation {
        Mutation::Create(document) => {
            if documents.contains_key(&document.id) {
                return Err(SyncError::TransactionConflict(format!(
                    "document already exists: {}",
                    document.id
                )));
            }
            let mut document = document.clone();
            stamp_revision(&mut document);
            documents.insert(document.id.clone(), document);
        }
        Mutation::CreateOrReplace(document) => {
            let mut document = document.clone();
            document.fields.remove("_createdAt");
            stamp_revision(&mut document);
            documents.insert(document.id.clone(), document);
        }
        Mutation::Patch(patch) => {
            let existing = documents.get(&patch.id).ok_or_else(|| {
                SyncError::TransactionConflict(format!("cannot patch missing document: {}", patch.id))
            })?;
            let mut patched = apply_patch(existing, patch)?;
            stamp_revision(&mut patched);
            documents.insert(patched.id.clone(), patched);
        }
        Mutation::Delete { id } => {
            documents.remove(id);
        }
    }
    Ok(())
}

fn apply_patch(document: &Document, patch: &Patch) -> Result<Document> {
    let mut object = match document.to_value() {
        Value::Object(object) => object,
        _ => Map::new(),
    };

    if let Some(set) = &patch.set {
        for (key, value) in set {
            if key == "_id" {
                continue;
            }
            object.insert(key.clone(), value.clone());
        }
    }

    for path in &patch.unset {
        unset_path(&mut object, path)?;
    }

    if let Some(insert) = &patch.insert {
        insert_items(&mut object, insert)?;
    }

    let mut patched: Document = serde_json::from_value(Value::Object(object))?;
    patched.id = document.id.clone();
    Ok(patched)
}

#[derive(Debug, PartialEq)]
enum Selector {
    Key(String),
    Index(i64),
}

/// `field`, `field[_key == "k"]`, `field[-1]`
fn parse_path(path: &str) -> Result<(String, Option<Selector>)> {
    let Some(open) = path.find('[') else {
        return Ok((path.trim().to_string(), None));
    };
    let field = path[..open].trim().to_string();
    let inner = path[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| SyncError::Store(format!("unsupported path: {}", path)))?
        .trim();

    if let Some((lhs, rhs)) = inner.split_once("==") {
        if lhs.trim() != "_key" {
            return Err(SyncError::Store(format!("unsupported path: {}", path)));
        }
        let key = rhs.trim().trim_matches(|c| c == '"' || c == '\'');
        return Ok((field, Some(Selector::Key(key.to_string()))));
    }

    let index = inner
        .parse::<i64>()
        .map_err(|_| SyncError::Store(format!("unsupported path: {}", path)))?;
    Ok((field, Some(Selector::Index(index))))
}

fn resolve_index(items: &[Value], selector: &Selector) -> Option<usize> {
    match selector {
        Selector::Index(index) if *index < 0 => {
            let resolved = items.len() as i64 + index;
            (resolved >= 0).then_some(resolved as usize)
        }
        Selector::Index(index) => {
            let resolved = *index as usize;
            (resolved < items.len()).then_some(resolved)
        }
        Selector::Key(key) => items
            .iter()
            .position(|item| item.get("_key").and_then(Value::as_str) == Some(key.as_str())),
    }
}

fn unset_path(object: &mut Map<String, Value>, path: &str) -> Result<()> {
    let (field, selector) = parse_path(path)?;
    match selector {
        None => {
            object.remove(&field);
        }
        Some(Selector::Key(key)) => {
            if let Some(Value::Array(items)) = object.get_mut(&field) {
                items.retain(|item| item.get("_key").and_then(Value::as_str) != Some(key.as_str()));
            }
        }
        Some(selector) => {
            if let Some(Value::Array(items)) = object.get_mut(&field) {
                if let Some(index) = resolve_index(items, &selector) {
                    items.remove(index);
                }
            }
        }
    }
    Ok(())
}

fn insert_items(object: &mut Map<String, Value>, insert: &Insert) -> Result<()> {
    let (selector_path, after) = match (&insert.after, &insert.before) {
        (Some(path), _) => (path, true),
        (None, Some(path)) => (path, false),
        (None, None) => return Err(SyncError::Store("insert without position".to_string())),
    };
    let (field, selector) = parse_path(selector_path)?;
    let selector = selector
        .ok_or_else(|| SyncError::Store(format!("insert needs an array selector: {}", selector_path)))?;

    let items = match object
        .entry(field.clone())
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => items,
        _ => return Err(SyncError::Store(format!("{} is not an array", field))),
    };

    let position = match resolve_index(items, &selector) {
        Some(index) if after => index + 1,
        Some(index) => index,
        None if items.is_empty() => 0,
        None => {
            return Err(SyncError::Store(format!(
                "insert target not found: {}",
                selector_path
            )))
        }
    };

    for (offset, item) in insert.items.iter().enumerate() {
        items.insert(position + offset, item.clone());
    }
    Ok(())
}

fn translation_entries(document: &Document) -> Vec<Value> {
    document
        .fields
        .get(TRANSLATIONS_ARRAY_NAME)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn entry_ref(entry: &Value) -> Option<&str> {
    entry
        .get("value")
        .and_then(|value| value.get("_ref"))
        .and_then(Value::as_str)
}
