use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use super::translations::add_storage;
use super::{ActionResponse, BackendContext};
use crate::document::{deserialize_file_id, Document};
use crate::error::{Result, SyncError};
use crate::vendor::SourceFile;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileInput {
    #[serde(deserialize_with = "deserialize_file_id")]
    pub source_file_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSourceFileInput {
    #[serde(deserialize_with = "deserialize_file_id")]
    pub source_file_id: u64,
    pub current_document: Document,
}

/// Current source markup as Crowdin holds it.
pub async fn get_source_file_data(ctx: &BackendContext, input: SourceFileInput) -> ActionResponse {
    match ctx
        .vendor
        .download_source_file(ctx.project_id, input.source_file_id)
        .await
    {
        Ok(source_file) => ActionResponse::ok("SourceFileFound", "Source file found")
            .with("sourceFile", Value::String(source_file)),
        Err(e) => {
            error!("Failed to download source file {}: {}", input.source_file_id, e);
            ActionResponse::not_found("SourceFileNotFound", "Source file not found")
        }
    }
}

pub async fn get_file_progress(ctx: &BackendContext, input: SourceFileInput) -> ActionResponse {
    match ctx
        .vendor
        .get_file_progress(ctx.project_id, input.source_file_id)
        .await
    {
        Ok(progress) => ActionResponse::ok("FileProgressFetched", "Source file fetched")
            .with("data", Value::Array(progress)),
        Err(e) => {
            error!("Failed to fetch progress of {}: {}", input.source_file_id, e);
            ActionResponse::not_found("FileProgressNotFound", "Source file not found")
        }
    }
}

/// Re-upload the document and swap it in as the new revision of the source file.
pub async fn update_source_file(ctx: &BackendContext, input: UpdateSourceFileInput) -> ActionResponse {
    match upload_revision(ctx, &input).await {
        Ok(source_file) => {
            info!("Updated source file {}", input.source_file_id);
            ActionResponse::ok("UpdateSourceFile", "Source file updated.")
                .with("sourceFile", json!(source_file))
        }
        Err(e) => {
            error!("Failed to update source file {}: {}", input.source_file_id, e);
            ActionResponse::not_found("SourceFileNotUpdated", "Source file not updated.")
        }
    }
}

async fn upload_revision(ctx: &BackendContext, input: &UpdateSourceFileInput) -> Result<SourceFile> {
    let markup = ctx.codec.encode(&input.current_document)?;
    let storage_name = format!("{}__{}", input.current_document.id, Uuid::new_v4());
    let storage = add_storage(ctx, &storage_name, markup).await?;

    ctx.vendor
        .update_or_restore_file(ctx.project_id, input.source_file_id, storage.id)
        .await
        .map_err(|e| SyncError::vendor("Failed to update source file", e))
}

pub async fn get_project(ctx: &BackendContext) -> ActionResponse {
    match ctx.vendor.get_project(ctx.project_id).await {
        Ok(project) => ActionResponse::ok("ProjectFound", "Project found").with("project", json!(project)),
        Err(e) => {
            error!("Failed to fetch project {}: {}", ctx.project_id, e);
            ActionResponse::not_found("ProjectNotFound", "Project not found")
        }
    }
}

/// Build the translation of one file for one language and fetch the markup.
pub async fn download_translation(
    ctx: &BackendContext,
    project_id: u64,
    source_file_id: u64,
    target_language_id: &str,
) -> Result<String> {
    ctx.vendor
        .build_file_translation(project_id, source_file_id, target_language_id)
        .await
        .map_err(|e| SyncError::vendor("Failed to download translation", e))
}
