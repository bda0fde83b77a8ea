// Vendor bridge actions
//
// Each action composes vendor calls with adapter calls and answers with an
// `ActionResponse`. Failing vendor steps are re-raised under a label naming the step;
// lookups that simply found nothing become 404 responses.

pub mod metadata;
pub mod preview;
pub mod source_file;
pub mod translations;
pub mod webhook;

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

pub use metadata::remove_crowdin_metadata;
pub use preview::{build_preview_url, get_preview_url, refresh_ptd};
pub use source_file::{get_file_progress, get_project, get_source_file_data, update_source_file};
pub use translations::create_translations;
pub use webhook::{handle_webhook, WebhookBatch, WebhookEvent};

use crate::adapter::I18nAdapter;
use crate::codec::HtmlCodec;
use crate::config::DirectoryRule;
use crate::error::SyncError;
use crate::store::ContentStore;
use crate::vendor::VendorClient;

/// Everything one request needs. The vendor client lives exactly as long as the context.
#[derive(Clone)]
pub struct BackendContext {
    pub store: Arc<dyn ContentStore>,
    pub vendor: Arc<dyn VendorClient>,
    pub adapter: Arc<dyn I18nAdapter>,
    pub codec: Arc<HtmlCodec>,
    pub project_id: u64,
    pub supported_target_langs: Vec<String>,
    pub directories: Vec<DirectoryRule>,
    pub pathname_field: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Status plus JSON body; the transport echoes both unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ActionResponse {
    pub fn new(status: u16, code: &str, message: &str) -> Self {
        Self {
            status,
            body: ResponseBody {
                code: code.to_string(),
                message: message.to_string(),
                data: Map::new(),
            },
        }
    }

    pub fn ok(code: &str, message: &str) -> Self {
        Self::new(200, code, message)
    }

    pub fn not_found(code: &str, message: &str) -> Self {
        Self::new(404, code, message)
    }

    /// 200 with `{}`
    pub fn empty() -> Self {
        Self {
            status: 200,
            body: ResponseBody::default(),
        }
    }

    pub fn invalid_request() -> Self {
        Self::new(400, "InvalidRequest", "Invalid request")
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.body.data.insert(key.to_string(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response for an error that escaped an action.
    pub fn from_error(err: &SyncError) -> Self {
        let (status, code) = match err {
            SyncError::InvalidRequest => return Self::invalid_request(),
            SyncError::Vendor { .. } | SyncError::Http(_) => (502, "VendorCallFailed"),
            SyncError::DocumentNotFound(_) => (404, "DocumentNotFound"),
            SyncError::Adapter { .. } => (500, "AdapterError"),
            SyncError::TransactionConflict(_) => (409, "TransactionConflict"),
            SyncError::Store(_) => (500, "StoreError"),
            SyncError::Codec(_) => (422, "InvalidMarkup"),
            _ => (500, "InternalError"),
        };
        Self::new(status, code, &err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_shape() {
        let response = ActionResponse::ok("ProjectFound", "Project found")
            .with("previewUrl", json!("https://site.test/fr"));
        assert_eq!(
            serde_json::to_value(&response.body).unwrap(),
            json!({ "code": "ProjectFound", "message": "Project found", "previewUrl": "https://site.test/fr" })
        );

        let empty = ActionResponse::empty();
        assert_eq!(serde_json::to_value(&empty.body).unwrap(), json!({}));
    }

    #[test]
    fn test_errors_map_to_named_codes() {
        let vendor = ActionResponse::from_error(&SyncError::vendor("Failed to create storage", "boom"));
        assert_eq!(vendor.status, 502);
        assert_eq!(vendor.body.code, "VendorCallFailed");
        assert!(vendor.body.message.contains("Failed to create storage"));

        let missing = ActionResponse::from_error(&SyncError::DocumentNotFound("fr".into()));
        assert_eq!(missing.status, 404);

        let invalid = ActionResponse::from_error(&SyncError::InvalidRequest);
        assert_eq!(invalid, ActionResponse::invalid_request());
        assert!(!invalid.is_success());
    }
}
