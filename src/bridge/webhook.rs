use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};

use super::source_file::download_translation;
use super::{ActionResponse, BackendContext};
use crate::document::deserialize_file_id;
use crate::error::{Result, SyncError};
use crate::ids::{id_from_source_file_name, undraft_id};

const KNOWN_EVENTS: [&str; 4] = [
    "file.approved",
    "file.deleted",
    "translation.updated",
    "file.translated",
];

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookProject {
    #[serde(deserialize_with = "deserialize_file_id")]
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookFile {
    #[serde(deserialize_with = "deserialize_file_id")]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project: Option<WebhookProject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookLanguage {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslatedString {
    pub file: WebhookFile,
    #[serde(default)]
    pub project: Option<WebhookProject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTranslation {
    pub target_language: WebhookLanguage,
    pub string: TranslatedString,
}

/// Crowdin webhook payloads this bridge reacts to.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum WebhookEvent {
    #[serde(rename = "file.approved", rename_all = "camelCase")]
    FileApproved {
        file: WebhookFile,
        target_language: WebhookLanguage,
    },
    #[serde(rename = "translation.updated", rename_all = "camelCase")]
    TranslationUpdated { new_translation: NewTranslation },
    #[serde(rename = "file.deleted")]
    FileDeleted { file: WebhookFile },
    #[serde(rename = "file.translated")]
    FileTranslated,
}

impl WebhookEvent {
    /// Unknown kinds parse to `None`; known kinds with a broken payload are errors.
    pub fn parse(raw: &Value) -> Result<Option<Self>> {
        let kind = raw.get("event").and_then(Value::as_str).unwrap_or_default();
        if !KNOWN_EVENTS.contains(&kind) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(raw.clone())?))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FileApproved { .. } => "SourceFileApproved",
            Self::TranslationUpdated { .. } => "CreateOrReplaceTemporaryTranslation",
            Self::FileDeleted { .. } => "DeleteSourceFile",
            Self::FileTranslated => "FileTranslated",
        }
    }
}

/// Raw sub-events of one delivery, in delivery order.
#[derive(Debug, Clone, Default)]
pub struct WebhookBatch {
    pub events: Vec<Value>,
}

impl WebhookBatch {
    /// `{ events: [...] }` or a single `{ event, ... }`; anything else is not a webhook.
    pub fn from_body(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        match object.get("events") {
            Some(Value::Array(events)) => Some(Self {
                events: events.clone(),
            }),
            Some(_) => None,
            None if object.contains_key("event") => Some(Self {
                events: vec![body.clone()],
            }),
            None => None,
        }
    }
}

/// Apply every sub-event in order. A failing sub-event is logged and never stops the batch.
pub async fn handle_webhook(ctx: &BackendContext, batch: WebhookBatch) -> ActionResponse {
    for raw in &batch.events {
        let event = match WebhookEvent::parse(raw) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("Ignoring webhook event {:?}", raw.get("event"));
                continue;
            }
            Err(e) => {
                error!("Malformed webhook event {:?}: {}", raw.get("event"), e);
                continue;
            }
        };

        let label = event.label();
        match apply_event(ctx, event).await {
            Ok(()) => info!("[{}] Webhook event applied", label),
            Err(e) => error!("Error [{}] {}", label, e),
        }
    }

    ActionResponse::empty()
}

fn project_of(ctx: &BackendContext, project: Option<&WebhookProject>) -> u64 {
    project.map(|p| p.id).unwrap_or(ctx.project_id)
}

fn source_doc_id(file: &WebhookFile) -> Result<String> {
    let id = undraft_id(&id_from_source_file_name(&file.name));
    if id.is_empty() {
        return Err(SyncError::adapter(
            "Cannot resolve source document",
            format!("file name {:?}", file.name),
        ));
    }
    Ok(id)
}

async fn apply_event(ctx: &BackendContext, event: WebhookEvent) -> Result<()> {
    match event {
        WebhookEvent::FileApproved {
            file,
            target_language,
        } => {
            let doc_id = source_doc_id(&file)?;
            let project_id = project_of(ctx, file.project.as_ref());
            let translation = download_translation(ctx, project_id, file.id, &target_language.id).await?;
            ctx.adapter
                .update_target_document(ctx.store.as_ref(), &doc_id, &translation, &target_language.id, true)
                .await?;
        }
        WebhookEvent::TranslationUpdated { new_translation } => {
            let file = &new_translation.string.file;
            let lang = &new_translation.target_language.id;
            let doc_id = source_doc_id(file)?;
            let project = new_translation
                .string
                .project
                .as_ref()
                .or(file.project.as_ref());
            let translation = download_translation(ctx, project_of(ctx, project), file.id, lang).await?;
            ctx.adapter
                .create_or_replace_ptd(ctx.store.as_ref(), &doc_id, file.id, &translation, lang)
                .await?;
        }
        WebhookEvent::FileDeleted { file } => {
            ctx.adapter
                .remove_crowdin_metadata(ctx.store.as_ref(), file.id)
                .await?;
        }
        WebhookEvent::FileTranslated => {
            debug!("Translated files are picked up on approval");
        }
    }
    Ok(())
}
