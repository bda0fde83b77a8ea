// Content store access
//
// Everything the sync needs from the document store goes through `ContentStore`:
// - Sanity: the HTTP query and mutation API
// - Memory: an in-process store for local runs and tests
//
// Writes are staged in a `Transaction` and committed as one unit.

pub mod memory;
pub mod sanity;
pub mod transaction;

use async_trait::async_trait;
use std::sync::Arc;

pub use transaction::*;
use crate::config::{StoreConfig, StoreKind};
use crate::document::{Document, TranslationMetadata};
use crate::error::Result;

/// Main trait for content store operations
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch one document by exact id (drafts included)
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Translation metadata document referencing `published_id`, references resolved
    async fn find_translation_metadata(&self, published_id: &str) -> Result<Option<TranslationMetadata>>;

    /// Every document stamped with this Crowdin source file
    async fn find_by_source_file_id(&self, source_file_id: u64) -> Result<Vec<Document>>;

    /// Documents of one language whose job points at `source_doc_id`, the source excluded
    async fn find_target_documents(
        &self,
        source_doc_id: &str,
        language_field: &str,
        lang: &str,
    ) -> Result<Vec<Document>>;

    /// Apply every staged mutation or none of them
    async fn commit(&self, transaction: Transaction, options: CommitOptions) -> Result<Vec<Document>>;
}

/// Factory for creating content store instances
pub struct StoreFactory;

impl StoreFactory {
    pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn ContentStore>> {
        match config.kind {
            StoreKind::Sanity => Ok(Arc::new(sanity::SanityStore::new(config.clone())?)),
            StoreKind::Memory => Ok(Arc::new(memory::MemoryStore::new())),
        }
    }
}
