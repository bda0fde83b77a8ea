use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::preview::build_preview_url;
use super::{ActionResponse, BackendContext};
use crate::document::Document;
use crate::error::{Result, SyncError};
use crate::ids::{source_file_name, translation_key};
use crate::langs::{format_langs_for_vendor, langs_are_the_same};
use crate::vendor::{CreateFileRequest, StorageRef};

const PREVIEW_SEPARATOR: &str = "\n\n--------------------\n\n";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTranslationsInput {
    pub current_document: Document,
    #[serde(default)]
    pub source_file_title: String,
    pub translations: Vec<String>,
    /// Changed field paths; empty means the whole document
    #[serde(default)]
    pub diff_paths: Vec<Vec<String>>,
}

/// Open a Crowdin job for the document and make sure every requested language has a
/// target document linked to it.
pub async fn create_translations(
    ctx: &BackendContext,
    input: CreateTranslationsInput,
    origin: &str,
) -> Result<ActionResponse> {
    let document = &input.current_document;
    let excluded_target_languages: Vec<String> = ctx
        .supported_target_langs
        .iter()
        .filter(|lang| !input.translations.iter().any(|l| langs_are_the_same(l, lang)))
        .cloned()
        .collect();

    let markup = ctx.codec.encode(document)?;
    let storage = add_storage(ctx, &document.id, markup).await?;
    let directory_id = get_directory_id(ctx, &document.doc_type).await?;

    let title = if input.source_file_title.trim().is_empty() {
        document.id.clone()
    } else {
        input.source_file_title.clone()
    };
    let request = CreateFileRequest {
        storage_id: storage.id,
        name: source_file_name(&Uuid::new_v4().to_string(), &storage.file_name),
        title,
        file_type: "html".to_string(),
        directory_id,
        context: preview_context(ctx, document, origin),
        excluded_target_languages: format_langs_for_vendor(&excluded_target_languages),
    };
    let file = ctx
        .vendor
        .create_file(ctx.project_id, request)
        .await
        .map_err(|e| SyncError::vendor("Failed to create source file", e))?;
    info!("Created source file {} for {}", file.id, document.id);

    ctx.adapter
        .get_or_create_translated_documents(
            ctx.store.as_ref(),
            document,
            &format_langs_for_vendor(&input.translations),
            file.id,
        )
        .await
        .map_err(|e| SyncError::adapter("Failed to create translated documents", e))?;

    let diff_paths = if input.diff_paths.is_empty() {
        vec![Vec::new()]
    } else {
        input.diff_paths.clone()
    };
    let job_key = translation_key(
        &document.id,
        document.rev.as_deref().unwrap_or_default(),
        &diff_paths,
        &input.translations,
    );

    Ok(ActionResponse::ok("AllTranslationsCreated", "All translations created")
        .with("sourceFileId", json!(file.id))
        .with("jobKey", Value::String(job_key)))
}

pub async fn add_storage(ctx: &BackendContext, file_name: &str, markup: String) -> Result<StorageRef> {
    ctx.vendor
        .add_storage(file_name, markup)
        .await
        .map_err(|e| SyncError::vendor("Failed to create storage", e))
}

/// Directory configured for the document type, created on first use.
pub async fn get_directory_id(ctx: &BackendContext, doc_type: &str) -> Result<Option<u64>> {
    let Some(rule) = ctx.directories.iter().find(|rule| rule.doc_type == doc_type) else {
        return Ok(None);
    };

    let label = "Failed to get or create directory id";
    let directories = ctx
        .vendor
        .list_directories(ctx.project_id)
        .await
        .map_err(|e| SyncError::vendor(label, e))?;

    if let Some(directory) = directories.iter().find(|dir| dir.name == rule.name) {
        return Ok(Some(directory.id));
    }

    debug!("Creating directory {:?}", rule.name);
    let directory = ctx
        .vendor
        .create_directory(ctx.project_id, &rule.name)
        .await
        .map_err(|e| SyncError::vendor(label, e))?;
    Ok(Some(directory.id))
}

/// Preview links shown to translators, one per supported target language.
fn preview_context(ctx: &BackendContext, document: &Document, origin: &str) -> String {
    let pathname = document
        .fields
        .get(&ctx.pathname_field)
        .and_then(|value| value.get("current"))
        .and_then(Value::as_str);

    ctx.supported_target_langs
        .iter()
        .map(|lang| {
            format!(
                "Preview link - {}\n\n{}",
                lang.to_uppercase(),
                build_preview_url(origin, lang, pathname)
            )
        })
        .collect::<Vec<_>>()
        .join(PREVIEW_SEPARATOR)
}
