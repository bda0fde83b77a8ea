// i18n adapters
//
// An adapter knows how a particular localization model stores language versions:
// where the language tag lives, how target documents are linked to their source,
// and how translated content is written back. The store is passed per call; adapters
// keep no state between calls.

pub mod document_i18n;

use async_trait::async_trait;
use std::sync::Arc;

pub use document_i18n::DocumentI18nAdapter;
use crate::codec::HtmlCodec;
use crate::config::I18nConfig;
use crate::document::{DocPair, Document};
use crate::error::Result;
use crate::store::ContentStore;

/// Main trait for localization model operations
#[async_trait]
pub trait I18nAdapter: Send + Sync {
    /// Language tag of a document, if it has one
    fn get_document_lang(&self, document: &Document) -> Option<String>;

    /// Ensure a document exists for every target language and link it to the source
    async fn get_or_create_translated_documents(
        &self,
        store: &dyn ContentStore,
        source_doc: &Document,
        target_langs: &[String],
        source_file_id: u64,
    ) -> Result<Vec<DocPair>>;

    /// Merge a translation into the real target document, dropping its preview document
    async fn update_target_document(
        &self,
        store: &dyn ContentStore,
        source_doc_id: &str,
        translation: &str,
        target_language_id: &str,
        mark_as_completed: bool,
    ) -> Result<Vec<Document>>;

    /// Write an in-flight translation into the preview document
    async fn create_or_replace_ptd(
        &self,
        store: &dyn ContentStore,
        source_doc_id: &str,
        source_file_id: u64,
        translation: &str,
        target_language_id: &str,
    ) -> Result<Vec<Document>>;

    /// Close the job for a source file on every document stamped with it
    async fn remove_crowdin_metadata(
        &self,
        store: &dyn ContentStore,
        source_file_id: u64,
    ) -> Result<Vec<Document>>;
}

/// Factory for creating adapter instances
pub struct AdapterFactory;

impl AdapterFactory {
    /// Create the document-internationalization adapter from the i18n settings
    pub fn create_adapter(config: &I18nConfig, codec: Arc<HtmlCodec>) -> Arc<dyn I18nAdapter> {
        Arc::new(DocumentI18nAdapter::new(
            &config.language_field,
            &config.pathname_field,
            codec,
        ))
    }
}
