use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};

use super::source_file::download_translation;
use super::{ActionResponse, BackendContext};
use crate::document::deserialize_file_id;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPreviewUrlInput {
    pub target_language: String,
    pub doc_type: String,
    pub source_doc_id: String,
    #[serde(default)]
    pub pathname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPtdInput {
    #[serde(deserialize_with = "deserialize_file_id")]
    pub source_file_id: u64,
    pub source_doc_id: String,
    pub target_language: String,
}

/// `<origin>/<lang>` followed by the document route, if any.
pub fn build_preview_url(origin: &str, target_lang: &str, pathname: Option<&str>) -> String {
    format!(
        "{}/{}{}",
        origin.trim_end_matches('/'),
        target_lang.to_lowercase(),
        pathname.unwrap_or_default()
    )
}

pub fn get_preview_url(input: GetPreviewUrlInput, origin: &str) -> ActionResponse {
    let preview_url = build_preview_url(origin, &input.target_language, input.pathname.as_deref());
    debug!(
        "Preview of {} {} in {}: {}",
        input.doc_type, input.source_doc_id, input.target_language, preview_url
    );
    ActionResponse::ok("ProjectFound", "Project found").with("previewUrl", Value::String(preview_url))
}

/// Pull the current translation of the file into the preview document.
pub async fn refresh_ptd(ctx: &BackendContext, input: RefreshPtdInput) -> Result<ActionResponse> {
    let translation = download_translation(
        ctx,
        ctx.project_id,
        input.source_file_id,
        &input.target_language,
    )
    .await?;

    match ctx
        .adapter
        .create_or_replace_ptd(
            ctx.store.as_ref(),
            &input.source_doc_id,
            input.source_file_id,
            &translation,
            &input.target_language,
        )
        .await
    {
        Ok(_) => {
            info!(
                "Refreshed preview of {} ({})",
                input.source_doc_id, input.target_language
            );
            Ok(ActionResponse::ok(
                "RefreshTemporaryTranslation",
                "Refresh temporary translation",
            ))
        }
        Err(e) => {
            error!("Failed to refresh preview of {}: {}", input.source_doc_id, e);
            Ok(ActionResponse::not_found(
                "ErrorRefreshTemporaryTranslation",
                "Failed to refresh temporary translation",
            ))
        }
    }
}
