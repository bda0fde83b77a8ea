use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::I18nAdapter;
use crate::codec::HtmlCodec;
use crate::document::{
    is_ptd_doc, translation_reference, CrowdinMetadata, DocPair, Document, METADATA_KEY,
    METADATA_SCHEMA_NAME, SYSTEM_KEYS, TRANSLATIONS_ARRAY_NAME,
};
use crate::error::{Result, SyncError};
use crate::ids::{draft_id, is_draft, ptd_id, undraft_id};
use crate::langs::langs_are_the_same;
use crate::store::{CommitOptions, ContentStore, Patch, Transaction};

const PREVIEW_PATH_SUFFIX: &str = "-preview";

/// Adapter for the document-internationalization model: one document per language,
/// linked through a `translation.metadata` document holding weak references.
pub struct DocumentI18nAdapter {
    language_field: String,
    pathname_field: String,
    codec: Arc<HtmlCodec>,
}

impl DocumentI18nAdapter {
    pub fn new(language_field: &str, pathname_field: &str, codec: Arc<HtmlCodec>) -> Self {
        Self {
            language_field: language_field.to_string(),
            pathname_field: pathname_field.to_string(),
            codec,
        }
    }

    /// Language pairs already known for the source: the metadata document's live entries,
    /// or the source's own draft/published pair when nothing links it yet.
    async fn initial_pairs(
        &self,
        store: &dyn ContentStore,
        published_id: &str,
        source_lang: &str,
    ) -> Result<(Option<String>, Vec<DocPair>)> {
        if let Some(metadata) = store.find_translation_metadata(published_id).await? {
            let pairs = metadata
                .translations
                .into_iter()
                .filter(DocPair::is_live)
                .collect();
            return Ok((Some(metadata.id), pairs));
        }

        let pair = DocPair {
            lang: source_lang.to_string(),
            published: store.get_document(published_id).await?,
            draft: store.get_document(&draft_id(published_id)).await?,
        };
        if !pair.is_live() {
            return Err(SyncError::adapter(
                "Failed fetching fresh documents",
                published_id,
            ));
        }
        Ok((None, vec![pair]))
    }

    /// Translated fields over the existing target; vendor metadata and store-managed keys
    /// of the translation never leak into the target.
    fn merge_translation(&self, target: &Document, translation: Document, lang: &str, mark_as_completed: bool) -> Document {
        let mut merged = target.clone();
        merged.strip_system_keys();

        for (key, value) in translation.fields {
            if key == METADATA_KEY || SYSTEM_KEYS.contains(&key.as_str()) {
                continue;
            }
            merged.fields.insert(key, value);
        }

        merged
            .fields
            .insert(self.language_field.clone(), Value::String(lang.to_string()));
        if mark_as_completed {
            merged.fields.remove(METADATA_KEY);
        }
        merged
    }
}

#[async_trait]
impl I18nAdapter for DocumentI18nAdapter {
    fn get_document_lang(&self, document: &Document) -> Option<String> {
        document
            .str_field(&self.language_field)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
    }

    async fn get_or_create_translated_documents(
        &self,
        store: &dyn ContentStore,
        source_doc: &Document,
        target_langs: &[String],
        source_file_id: u64,
    ) -> Result<Vec<DocPair>> {
        let source_lang = self.get_document_lang(source_doc).unwrap_or_default();
        let published_id = undraft_id(&source_doc.id);
        let (metadata_id, initial) = self
            .initial_pairs(store, &published_id, &source_lang)
            .await?;

        let fresh_pair = initial
            .iter()
            .find(|pair| langs_are_the_same(&pair.lang, &source_lang));
        let fresh_doc = fresh_pair
            .and_then(|pair| pair.preferred(is_draft(&source_doc.id)))
            .cloned()
            .ok_or_else(|| {
                SyncError::adapter("Failed fetching fresh source document", &source_doc.id)
            })?;

        let metadata = CrowdinMetadata::new(source_file_id, &source_doc.id);

        let mut missing: Vec<(String, String, Document)> = Vec::new();
        for lang in target_langs {
            let already_linked = initial
                .iter()
                .any(|pair| langs_are_the_same(&pair.lang, lang) && pair.is_live());
            let already_queued = missing
                .iter()
                .any(|(queued, _, _)| langs_are_the_same(queued, lang));
            if already_linked || already_queued {
                continue;
            }

            let published_target_id = Uuid::new_v4().to_string();
            let mut target = fresh_doc.clone();
            target.strip_system_keys();
            target.id = draft_id(&published_target_id);
            target.set_crowdin_metadata(&metadata);
            target.fields.insert(
                self.language_field.clone(),
                Value::String(lang.to_lowercase()),
            );
            missing.push((lang.clone(), published_target_id, target));
        }

        if missing.is_empty() {
            debug!("Every target language of {} already has a document", published_id);
            return Ok(initial);
        }

        let mut transaction = Transaction::new();
        for (_, _, target) in &missing {
            transaction.create(target.clone());
        }

        let new_references: Vec<Value> = missing
            .iter()
            .map(|(lang, target_id, _)| translation_reference(lang, target_id, &source_doc.doc_type))
            .collect();

        match metadata_id {
            Some(metadata_id) => {
                let stale_entries = missing
                    .iter()
                    .map(|(lang, _, _)| format!("{}[_key == \"{}\"]", TRANSLATIONS_ARRAY_NAME, lang.to_lowercase()));
                transaction.patch(
                    Patch::new(metadata_id)
                        .unset(stale_entries)
                        .insert_after(format!("{}[-1]", TRANSLATIONS_ARRAY_NAME), new_references),
                );
            }
            None => {
                let mut references = vec![translation_reference(
                    &source_lang,
                    &source_doc.id,
                    &source_doc.doc_type,
                )];
                references.extend(new_references);
                transaction.create(
                    Document::new(Uuid::new_v4().to_string(), METADATA_SCHEMA_NAME)
                        .with_field(TRANSLATIONS_ARRAY_NAME, Value::Array(references))
                        .with_field("schemaTypes", json!([source_doc.doc_type])),
                );
            }
        }

        transaction.patch(Patch::new(fresh_doc.id.clone()).set(METADATA_KEY, metadata.to_value()));

        let committed = store
            .commit(transaction, CommitOptions::returning_documents())
            .await?;
        info!(
            "Created {} translated documents for {}",
            missing.len(),
            published_id
        );

        let mut pairs = initial;
        for (lang, _, target) in missing {
            let draft = committed
                .iter()
                .find(|doc| doc.id == target.id)
                .cloned()
                .unwrap_or(target);
            pairs.push(DocPair {
                lang,
                draft: Some(draft),
                published: None,
            });
        }
        Ok(pairs)
    }

    async fn update_target_document(
        &self,
        store: &dyn ContentStore,
        source_doc_id: &str,
        translation: &str,
        target_language_id: &str,
        mark_as_completed: bool,
    ) -> Result<Vec<Document>> {
        let lang = target_language_id.to_lowercase();
        let source_doc_id = undraft_id(source_doc_id);
        let matches = store
            .find_target_documents(&source_doc_id, &self.language_field, &lang)
            .await?;

        let target = matches
            .iter()
            .find(|doc| !is_ptd_doc(doc))
            .ok_or_else(|| SyncError::DocumentNotFound(format!("{} target for {}", lang, source_doc_id)))?;
        let ptd = matches.iter().find(|doc| is_ptd_doc(doc));

        let decoded = self.codec.decode(translation)?;
        let merged = self.merge_translation(target, decoded, &lang, mark_as_completed);

        let mut transaction = Transaction::new();
        transaction.create_or_replace(merged);
        if let Some(ptd) = ptd {
            transaction.delete(ptd.id.clone());
        }

        debug!(
            "Updating {} from translation ({}, completed: {})",
            target.id, lang, mark_as_completed
        );
        store
            .commit(transaction, CommitOptions::asynchronous())
            .await
    }

    async fn create_or_replace_ptd(
        &self,
        store: &dyn ContentStore,
        source_doc_id: &str,
        source_file_id: u64,
        translation: &str,
        target_language_id: &str,
    ) -> Result<Vec<Document>> {
        let source_doc_id = undraft_id(source_doc_id);
        let decoded = self.codec.decode(translation)?;

        let mut ptd = Document::new(ptd_id(target_language_id, &source_doc_id), decoded.doc_type);
        ptd.fields = decoded.fields;
        ptd.strip_system_keys();

        if let Some(Value::Object(pathname)) = ptd.fields.get_mut(&self.pathname_field) {
            if let Some(Value::String(current)) = pathname.get_mut("current") {
                current.push_str(PREVIEW_PATH_SUFFIX);
            }
        }
        ptd.fields.insert(
            self.language_field.clone(),
            Value::String(target_language_id.to_lowercase()),
        );
        ptd.set_crowdin_metadata(&CrowdinMetadata::new(source_file_id, &source_doc_id));

        let mut transaction = Transaction::new();
        transaction.create_or_replace(ptd);
        store
            .commit(transaction, CommitOptions::asynchronous())
            .await
    }

    async fn remove_crowdin_metadata(
        &self,
        store: &dyn ContentStore,
        source_file_id: u64,
    ) -> Result<Vec<Document>> {
        let documents = store.find_by_source_file_id(source_file_id).await?;
        if documents.is_empty() {
            warn!(
                "No documents found with crowdinMetadata.sourceFileId: {}",
                source_file_id
            );
            return Ok(Vec::new());
        }

        let mut transaction = Transaction::new();
        for document in &documents {
            if is_ptd_doc(document) {
                transaction.delete(document.id.clone());
            } else {
                transaction.patch(Patch::new(document.id.clone()).unset([METADATA_KEY]));
            }
        }

        store
            .commit(transaction, CommitOptions::asynchronous())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn adapter() -> DocumentI18nAdapter {
        DocumentI18nAdapter::new("locale", "pathname", Arc::new(HtmlCodec::default()))
    }

    fn source() -> Document {
        Document::new("home", "page")
            .with_field("locale", json!("en"))
            .with_field("title", json!("Hello"))
            .with_field("pathname", json!({ "_type": "slug", "current": "/home" }))
    }

    fn langs(langs: &[&str]) -> Vec<String> {
        langs.iter().map(|l| l.to_string()).collect()
    }

    fn metadata_doc(store: &MemoryStore) -> Document {
        store
            .all()
            .into_iter()
            .find(|doc| doc.doc_type == METADATA_SCHEMA_NAME)
            .unwrap()
    }

    fn translated_markup(title: &str) -> String {
        let translated = source().with_field("title", json!(title));
        HtmlCodec::default().encode(&translated).unwrap()
    }

    #[test]
    fn test_get_document_lang() {
        let adapter = adapter();
        assert_eq!(adapter.get_document_lang(&source()), Some("en".to_string()));
        assert_eq!(adapter.get_document_lang(&Document::new("x", "page")), None);
        let blank = Document::new("x", "page").with_field("locale", json!(""));
        assert_eq!(adapter.get_document_lang(&blank), None);
    }

    #[tokio::test]
    async fn test_creates_targets_metadata_and_stamps_source() {
        let store = MemoryStore::with_documents([source()]);
        let pairs = adapter()
            .get_or_create_translated_documents(&store, &source(), &langs(&["fr", "pt-BR"]), 42)
            .await
            .unwrap();

        assert_eq!(pairs.len(), 3);
        let portuguese = pairs.iter().find(|p| p.lang == "pt-BR").unwrap();
        let draft = portuguese.draft.as_ref().unwrap();
        assert!(is_draft(&draft.id));
        assert_eq!(draft.str_field("locale"), Some("pt-br"));
        assert_eq!(draft.str_field("title"), Some("Hello"));
        assert_eq!(draft.crowdin_metadata().unwrap().source_doc_id, "home");

        let stamped = store.get("home").unwrap();
        assert_eq!(stamped.crowdin_metadata().unwrap().source_file_id, 42);

        let metadata = metadata_doc(&store);
        let entries = metadata.fields[TRANSLATIONS_ARRAY_NAME].as_array().unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e["_key"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["en", "fr", "pt-br"]);
        assert_eq!(metadata.fields["schemaTypes"], json!(["page"]));
    }

    #[tokio::test]
    async fn test_second_call_creates_nothing() {
        let store = MemoryStore::with_documents([source()]);
        let adapter = adapter();

        let first = adapter
            .get_or_create_translated_documents(&store, &source(), &langs(&["fr"]), 42)
            .await
            .unwrap();
        let count = store.len();

        let second = adapter
            .get_or_create_translated_documents(&store, &source(), &langs(&["fr"]), 42)
            .await
            .unwrap();

        assert_eq!(store.len(), count);
        let first_fr = first.iter().find(|p| p.lang == "fr").unwrap();
        let second_fr = second.iter().find(|p| p.lang == "fr").unwrap();
        assert_eq!(
            first_fr.draft.as_ref().unwrap().id,
            second_fr.draft.as_ref().unwrap().id
        );
    }

    #[tokio::test]
    async fn test_stale_metadata_entry_is_replaced() {
        let metadata = Document::new("meta", METADATA_SCHEMA_NAME).with_field(
            TRANSLATIONS_ARRAY_NAME,
            json!([
                translation_reference("en", "home", "page"),
                translation_reference("fr", "deleted-target", "page"),
            ]),
        );
        let store = MemoryStore::with_documents([source(), metadata]);

        adapter()
            .get_or_create_translated_documents(&store, &source(), &langs(&["fr"]), 7)
            .await
            .unwrap();

        let metadata = store.get("meta").unwrap();
        let entries = metadata.fields[TRANSLATIONS_ARRAY_NAME].as_array().unwrap();
        let french: Vec<&Value> = entries.iter().filter(|e| e["_key"] == "fr").collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(french.len(), 1);
        assert_ne!(french[0]["value"]["_ref"], "deleted-target");
    }

    #[tokio::test]
    async fn test_missing_source_fails_without_writes() {
        let store = MemoryStore::new();
        let err = adapter()
            .get_or_create_translated_documents(&store, &source(), &langs(&["fr"]), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Adapter { .. }));
        assert!(store.is_empty());
    }

    async fn seeded_with_french_target() -> (MemoryStore, String) {
        let store = MemoryStore::with_documents([source()]);
        let pairs = adapter()
            .get_or_create_translated_documents(&store, &source(), &langs(&["fr"]), 42)
            .await
            .unwrap();
        let target_id = pairs
            .iter()
            .find(|p| p.lang == "fr")
            .and_then(|p| p.draft.as_ref())
            .map(|d| d.id.clone())
            .unwrap();
        (store, target_id)
    }

    #[tokio::test]
    async fn test_update_target_completed_clears_metadata_and_ptd() {
        let (store, target_id) = seeded_with_french_target().await;
        let adapter = adapter();
        adapter
            .create_or_replace_ptd(&store, "home", 42, &translated_markup("Bonjour (wip)"), "fr")
            .await
            .unwrap();
        assert!(store.get("crowdin.ptd-fr-home").is_some());

        adapter
            .update_target_document(&store, "home", &translated_markup("Bonjour"), "FR", true)
            .await
            .unwrap();

        let target = store.get(&target_id).unwrap();
        assert_eq!(target.str_field("title"), Some("Bonjour"));
        assert_eq!(target.str_field("locale"), Some("fr"));
        assert!(target.fields.get(METADATA_KEY).is_none());
        assert!(store.get("crowdin.ptd-fr-home").is_none());
    }

    #[tokio::test]
    async fn test_update_target_in_progress_keeps_metadata() {
        let (store, target_id) = seeded_with_french_target().await;
        adapter()
            .update_target_document(&store, "drafts.home", &translated_markup("Bonjour"), "fr", false)
            .await
            .unwrap();

        let target = store.get(&target_id).unwrap();
        assert_eq!(target.str_field("title"), Some("Bonjour"));
        assert_eq!(target.crowdin_metadata().unwrap().source_file_id, 42);
    }

    #[tokio::test]
    async fn test_update_without_target_fails() {
        let store = MemoryStore::with_documents([source()]);
        let err = adapter()
            .update_target_document(&store, "home", &translated_markup("Hallo"), "de", true)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_ptd_gets_preview_pathname() {
        let store = MemoryStore::new();
        adapter()
            .create_or_replace_ptd(&store, "drafts.home", 9, &translated_markup("Bonjour"), "FR")
            .await
            .unwrap();

        let ptd = store.get("crowdin.ptd-fr-home").unwrap();
        assert_eq!(ptd.doc_type, "page");
        assert_eq!(ptd.fields["pathname"]["current"], "/home-preview");
        assert_eq!(ptd.str_field("locale"), Some("fr"));
        assert_eq!(ptd.crowdin_metadata().unwrap().source_doc_id, "home");
    }

    #[tokio::test]
    async fn test_remove_metadata_deletes_ptds_and_unstamps_others() {
        let (store, target_id) = seeded_with_french_target().await;
        let adapter = adapter();
        adapter
            .create_or_replace_ptd(&store, "home", 42, &translated_markup("Bonjour"), "fr")
            .await
            .unwrap();

        adapter.remove_crowdin_metadata(&store, 42).await.unwrap();

        assert!(store.get("crowdin.ptd-fr-home").is_none());
        assert!(store.get("home").unwrap().fields.get(METADATA_KEY).is_none());
        assert!(store.get(&target_id).unwrap().fields.get(METADATA_KEY).is_none());

        let none = adapter.remove_crowdin_metadata(&store, 42).await.unwrap();
        assert!(none.is_empty());
    }
}
