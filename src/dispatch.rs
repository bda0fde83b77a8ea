// Action dispatcher
//
// One entry point for everything the endpoint receives. A body is either a Crowdin
// webhook delivery or an editor action tagged with `action`; anything else is answered
// with the invalid-request response before any store or vendor call happens.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::bridge::preview::{GetPreviewUrlInput, RefreshPtdInput};
use crate::bridge::source_file::{SourceFileInput, UpdateSourceFileInput};
use crate::bridge::translations::CreateTranslationsInput;
use crate::bridge::{self, ActionResponse, BackendContext, WebhookBatch};
use crate::error::{Result, SyncError};

/// Editor actions with their required fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionRequest {
    RefreshPtd(RefreshPtdInput),
    CreateTranslations(CreateTranslationsInput),
    GetPreviewUrl(GetPreviewUrlInput),
    GetSourceFileData(SourceFileInput),
    GetFileProgress(SourceFileInput),
    UpdateSourceFile(UpdateSourceFileInput),
    GetProject,
    RemoveCrowdinMetadata(SourceFileInput),
}

impl ActionRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RefreshPtd(_) => "REFRESH_PTD",
            Self::CreateTranslations(_) => "CREATE_TRANSLATIONS",
            Self::GetPreviewUrl(_) => "GET_PREVIEW_URL",
            Self::GetSourceFileData(_) => "GET_SOURCE_FILE_DATA",
            Self::GetFileProgress(_) => "GET_FILE_PROGRESS",
            Self::UpdateSourceFile(_) => "UPDATE_SOURCE_FILE",
            Self::GetProject => "GET_PROJECT",
            Self::RemoveCrowdinMetadata(_) => "REMOVE_CROWDIN_METADATA",
        }
    }
}

#[derive(Debug, Clone)]
pub enum InboundRequest {
    Webhook(WebhookBatch),
    Action(ActionRequest),
}

/// Decide what a body is. Errors are always `SyncError::InvalidRequest`.
pub fn classify(body: Value) -> Result<InboundRequest> {
    if !body.is_object() {
        return Err(SyncError::InvalidRequest);
    }

    if let Some(batch) = WebhookBatch::from_body(&body) {
        return Ok(InboundRequest::Webhook(batch));
    }

    let action: ActionRequest = serde_json::from_value(body).map_err(|e| {
        debug!("Rejecting request: {}", e);
        SyncError::InvalidRequest
    })?;

    if let ActionRequest::CreateTranslations(input) = &action {
        if input.translations.is_empty() {
            debug!("Rejecting CREATE_TRANSLATIONS without languages");
            return Err(SyncError::InvalidRequest);
        }
    }

    Ok(InboundRequest::Action(action))
}

/// Classify, route and answer. `origin` is the scheme and host preview links point at.
pub async fn dispatch(ctx: &BackendContext, body: Value, origin: &str) -> ActionResponse {
    let request = match classify(body) {
        Ok(request) => request,
        Err(_) => return ActionResponse::invalid_request(),
    };

    match request {
        InboundRequest::Webhook(batch) => {
            debug!("Handling webhook batch of {} events", batch.events.len());
            bridge::handle_webhook(ctx, batch).await
        }
        InboundRequest::Action(action) => {
            let name = action.name();
            debug!("Handling {}", name);
            match run_action(ctx, action, origin).await {
                Ok(response) => response,
                Err(e) => {
                    error!("{} failed: {}", name, e);
                    ActionResponse::from_error(&e)
                }
            }
        }
    }
}

async fn run_action(ctx: &BackendContext, action: ActionRequest, origin: &str) -> Result<ActionResponse> {
    let response = match action {
        ActionRequest::CreateTranslations(input) => {
            bridge::create_translations(ctx, input, origin).await?
        }
        ActionRequest::GetSourceFileData(input) => bridge::get_source_file_data(ctx, input).await,
        ActionRequest::GetFileProgress(input) => bridge::get_file_progress(ctx, input).await,
        ActionRequest::UpdateSourceFile(input) => bridge::update_source_file(ctx, input).await,
        ActionRequest::GetProject => bridge::get_project(ctx).await,
        ActionRequest::GetPreviewUrl(input) => bridge::get_preview_url(input, origin),
        ActionRequest::RefreshPtd(input) => bridge::refresh_ptd(ctx, input).await?,
        ActionRequest::RemoveCrowdinMetadata(input) => {
            bridge::remove_crowdin_metadata(ctx, input).await
        }
    };
    Ok(response)
}
