use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{CommitOptions, ContentStore, Transaction};
use crate::config::{is_identifier, StoreConfig};
use crate::document::{Document, TranslationMetadata, METADATA_SCHEMA_NAME, TRANSLATIONS_ARRAY_NAME};
use crate::error::{Result, SyncError};

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
    #[serde(default)]
    results: Vec<MutationResult>,
}

#[derive(Debug, Deserialize)]
struct MutationResult {
    #[serde(default)]
    document: Option<Document>,
}

/// Content store backed by the Sanity HTTP API.
pub struct SanityStore {
    client: Client,
    config: StoreConfig,
}

impl SanityStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client, config })
    }

    fn base_url(&self, for_query: bool) -> String {
        let host = if for_query && self.config.use_cdn {
            "apicdn.sanity.io"
        } else {
            "api.sanity.io"
        };
        format!(
            "https://{}.{}/v{}",
            self.config.project_id, host, self.config.api_version
        )
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, params: Value) -> Result<T> {
        let url = format!("{}/data/query/{}", self.base_url(true), self.config.dataset);
        debug!("Querying content store: {}", query.trim());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&json!({ "query": query, "params": params }))
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("query request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::Store(format!(
                "query failed with {}: {}",
                status, error_text
            )));
        }

        let body: QueryResponse<T> = response.json().await?;
        Ok(body.result)
    }

    async fn mutate(&self, transaction: &Transaction, options: CommitOptions) -> Result<Vec<Document>> {
        let url = format!("{}/data/mutate/{}", self.base_url(false), self.config.dataset);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .query(&[
                ("returnDocuments", options.return_documents.to_string()),
                ("visibility", options.visibility.as_str().to_string()),
            ])
            .json(transaction)
            .send()
            .await
            .map_err(|e| SyncError::Store(format!("mutation request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::TransactionConflict(error_text));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::Store(format!(
                "mutation failed with {}: {}",
                status, error_text
            )));
        }

        let body: MutationResponse = response.json().await?;
        debug!(
            "Committed transaction {}",
            body.transaction_id.as_deref().unwrap_or("<unknown>")
        );
        Ok(body.results.into_iter().filter_map(|r| r.document).collect())
    }
}

#[async_trait]
impl ContentStore for SanityStore {
    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        self.query("*[_id == $id][0]", json!({ "id": id })).await
    }

    async fn find_translation_metadata(&self, published_id: &str) -> Result<Option<TranslationMetadata>> {
        let query = format!(
            r#"*[_type == $metadataType && references($publishedId)][0] {{
                _id,
                _type,
                "translations": {}[] {{
                    "lang": _key,
                    "published": value->,
                    "draft": *[_id == ("drafts." + ^.value._ref)][0],
                }}
            }}"#,
            TRANSLATIONS_ARRAY_NAME
        );

        self.query(
            &query,
            json!({ "metadataType": METADATA_SCHEMA_NAME, "publishedId": published_id }),
        )
        .await
    }

    async fn find_by_source_file_id(&self, source_file_id: u64) -> Result<Vec<Document>> {
        let documents: Option<Vec<Document>> = self
            .query(
                "*[crowdinMetadata.sourceFileId == $sourceFileId][]{...}",
                json!({ "sourceFileId": source_file_id }),
            )
            .await?;
        Ok(documents.unwrap_or_default())
    }

    async fn find_target_documents(
        &self,
        source_doc_id: &str,
        language_field: &str,
        lang: &str,
    ) -> Result<Vec<Document>> {
        if !is_identifier(language_field) {
            warn!("Refusing to query with language field {:?}", language_field);
            return Err(SyncError::Store(format!(
                "invalid language field: {}",
                language_field
            )));
        }

        let query = format!(
            r#"*[crowdinMetadata.sourceDocId == $docId && !(_id in [$docId, "drafts." + $docId]) && {} == $lang]"#,
            language_field
        );
        let documents: Option<Vec<Document>> = self
            .query(&query, json!({ "docId": source_doc_id, "lang": lang }))
            .await?;
        Ok(documents.unwrap_or_default())
    }

    async fn commit(&self, transaction: Transaction, options: CommitOptions) -> Result<Vec<Document>> {
        if transaction.is_empty() {
            return Ok(Vec::new());
        }
        self.mutate(&transaction, options).await
    }
}
