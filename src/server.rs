use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, HOST,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error, info};
use url::Url;

use crate::adapter::{AdapterFactory, I18nAdapter};
use crate::bridge::{ActionResponse, BackendContext};
use crate::codec::HtmlCodec;
use crate::config::{Config, DirectoryRule};
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::store::{ContentStore, StoreFactory};
use crate::vendor::{CrowdinClientFactory, VendorClientFactory, VendorCredentials};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const FALLBACK_ORIGIN: &str = "http://localhost";

/// Long-lived pieces shared by every request. Vendor clients are not among them.
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub adapter: Arc<dyn I18nAdapter>,
    pub codec: Arc<HtmlCodec>,
    pub vendor_factory: Arc<dyn VendorClientFactory>,
    pub credentials: VendorCredentials,
    pub supported_target_langs: Vec<String>,
    pub directories: Vec<DirectoryRule>,
    pub pathname_field: String,
    pub public_origin: Option<String>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let codec = Arc::new(HtmlCodec::from_config(&config.codec));
        Ok(Self {
            store: StoreFactory::create_store(&config.store)?,
            adapter: AdapterFactory::create_adapter(&config.i18n, codec.clone()),
            codec,
            vendor_factory: Arc::new(CrowdinClientFactory),
            credentials: VendorCredentials::from(&config.vendor),
            supported_target_langs: config.i18n.supported_target_langs(),
            directories: config.directories.clone(),
            pathname_field: config.i18n.pathname_field.clone(),
            public_origin: config.server.public_origin.clone(),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_vendor_factory(mut self, factory: Arc<dyn VendorClientFactory>) -> Self {
        self.vendor_factory = factory;
        self
    }

    /// Fresh context for one request, with its own vendor client.
    pub fn backend_context(&self) -> Result<BackendContext> {
        Ok(BackendContext {
            store: self.store.clone(),
            vendor: self.vendor_factory.create_client(&self.credentials)?,
            adapter: self.adapter.clone(),
            codec: self.codec.clone(),
            project_id: self.credentials.project_id,
            supported_target_langs: self.supported_target_langs.clone(),
            directories: self.directories.clone(),
            pathname_field: self.pathname_field.clone(),
        })
    }
}

pub fn create_router(state: Arc<AppState>, endpoint_path: &str) -> Router {
    Router::new()
        .route(endpoint_path, post(handle_request).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .with_state(state)
}

pub async fn serve(config: &Config, state: Arc<AppState>) -> Result<()> {
    let app = create_router(state, &config.server.endpoint_path);

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        config.server.bind_addr, config.server.port
    ))
    .await?;

    info!(
        "Listening on http://{}:{}{}",
        config.server.bind_addr, config.server.port, config.server.endpoint_path
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn handle_request(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let origin = request_origin(&headers, state.public_origin.as_deref());

    let response = match serde_json::from_slice::<Value>(&body) {
        Ok(body) => match state.backend_context() {
            Ok(ctx) => dispatch(&ctx, body, &origin).await,
            Err(e) => {
                error!("Failed to prepare request context: {}", e);
                ActionResponse::from_error(&e)
            }
        },
        Err(e) => {
            debug!("Unparseable request body: {}", e);
            ActionResponse::invalid_request()
        }
    };

    into_http(response)
}

fn into_http(response: ActionResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or_default().trim())
        .filter(|value| !value.is_empty())
}

fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Scheme and host the caller reached us on, behind proxies too.
pub fn request_origin(headers: &HeaderMap, public_origin: Option<&str>) -> String {
    let proto = header_str(headers, "x-forwarded-proto").unwrap_or("http");
    let host = header_str(headers, "x-forwarded-host").or_else(|| header_str(headers, HOST.as_str()));

    host.and_then(|host| origin_of(&format!("{}://{}", proto, host)))
        .or_else(|| public_origin.and_then(origin_of))
        .unwrap_or_else(|| FALLBACK_ORIGIN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::vendor::{MockVendorClient, VendorClient};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct FixedVendorFactory(Arc<dyn VendorClient>);

    impl VendorClientFactory for FixedVendorFactory {
        fn create_client(&self, _credentials: &VendorCredentials) -> Result<Arc<dyn VendorClient>> {
            Ok(self.0.clone())
        }
    }

    fn state(vendor: MockVendorClient) -> Arc<AppState> {
        let mut config = Config::default();
        config.i18n.supported_langs = vec!["en".into(), "fr".into()];
        let state = AppState::from_config(&config)
            .unwrap()
            .with_store(Arc::new(MemoryStore::new()))
            .with_vendor_factory(Arc::new(FixedVendorFactory(Arc::new(vendor))));
        Arc::new(state)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    fn assert_cors(headers: &HeaderMap) {
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], ALLOWED_HEADERS);
    }

    #[tokio::test]
    async fn test_preflight() {
        let router = create_router(state(MockVendorClient::new()), "/api/crowdin-sync");
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/crowdin-sync")
            .body(Body::empty())
            .unwrap();

        let (status, headers, _) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_invalid_request() {
        let router = create_router(state(MockVendorClient::new()), "/api/crowdin-sync");
        let request = Request::builder()
            .method("POST")
            .uri("/api/crowdin-sync")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, headers, body) = send(router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "InvalidRequest");
        assert_eq!(body["message"], "Invalid request");
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn test_preview_url_uses_forwarded_origin() {
        let router = create_router(state(MockVendorClient::new()), "/api/crowdin-sync");
        let request = Request::builder()
            .method("POST")
            .uri("/api/crowdin-sync")
            .header("content-type", "application/json")
            .header("host", "www.example.com")
            .header("x-forwarded-proto", "https")
            .body(Body::from(
                r#"{"action":"GET_PREVIEW_URL","targetLanguage":"fr","docType":"page","sourceDocId":"home","pathname":"/about"}"#,
            ))
            .unwrap();

        let (status, _, body) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["previewUrl"], "https://www.example.com/fr/about");
    }

    #[tokio::test]
    async fn test_webhook_answers_empty_object() {
        let router = create_router(state(MockVendorClient::new()), "/api/crowdin-sync");
        let request = Request::builder()
            .method("POST")
            .uri("/api/crowdin-sync")
            .body(Body::from(r#"{"event":"file.translated","file":{"id":1}}"#))
            .unwrap();

        let (status, headers, body) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({}));
        assert_cors(&headers);
    }

    #[test]
    fn test_request_origin() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_origin(&headers, None), "http://localhost");
        assert_eq!(
            request_origin(&headers, Some("https://site.test/some/path")),
            "https://site.test"
        );

        headers.insert(HOST, HeaderValue::from_static("localhost:3000"));
        assert_eq!(request_origin(&headers, Some("https://site.test")), "http://localhost:3000");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("www.example.com"));
        assert_eq!(request_origin(&headers, None), "https://www.example.com");
    }
}
