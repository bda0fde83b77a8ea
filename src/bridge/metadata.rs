use serde_json::json;
use tracing::{error, info};

use super::source_file::SourceFileInput;
use super::{ActionResponse, BackendContext};

/// Close the job for a source file: preview documents go, vendor metadata is stripped.
pub async fn remove_crowdin_metadata(ctx: &BackendContext, input: SourceFileInput) -> ActionResponse {
    match ctx
        .adapter
        .remove_crowdin_metadata(ctx.store.as_ref(), input.source_file_id)
        .await
    {
        Ok(updated) => {
            info!(
                "Removed Crowdin metadata of file {} from {} documents",
                input.source_file_id,
                updated.len()
            );
            ActionResponse::ok("RemovedCrowdinMetadata", "Removed Crowdin metadata.")
                .with("data", json!({ "success": "ok" }))
        }
        Err(e) => {
            error!("Failed to remove Crowdin metadata of {}: {}", input.source_file_id, e);
            ActionResponse::not_found(
                "ErrorRemovingCrowdinMetadata",
                "Error removing Crowdin metadata.",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::DocumentI18nAdapter;
    use crate::codec::HtmlCodec;
    use crate::document::{CrowdinMetadata, Document};
    use crate::store::memory::MemoryStore;
    use crate::vendor::MockVendorClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_remove_metadata_response() {
        let mut source = Document::new("home", "page");
        source.set_crowdin_metadata(&CrowdinMetadata::new(12, "home"));
        let store = Arc::new(MemoryStore::with_documents([source]));

        let codec = Arc::new(HtmlCodec::default());
        let ctx = BackendContext {
            store: store.clone(),
            vendor: Arc::new(MockVendorClient::new()),
            adapter: Arc::new(DocumentI18nAdapter::new("locale", "pathname", codec.clone())),
            codec,
            project_id: 1,
            supported_target_langs: Vec::new(),
            directories: Vec::new(),
            pathname_field: "pathname".into(),
        };

        let response = remove_crowdin_metadata(&ctx, SourceFileInput { source_file_id: 12 }).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body.data["data"]["success"], "ok");
        assert!(store.get("home").unwrap().crowdin_metadata().is_none());

        let nothing = remove_crowdin_metadata(&ctx, SourceFileInput { source_file_id: 99 }).await;
        assert_eq!(nothing.status, 200);
    }
}
