mod ingest;
mod scrape;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bizscout_scraper::Coordinator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ingest::Ingestor;
use crate::middleware::{request_id, REQUEST_ID_HEADER};

/// Whether `POST /api/v1/ingest` can run, and why not.
#[derive(Clone)]
pub enum IngestMode {
    NoDatabase,
    Disabled,
    Enabled(Arc<Ingestor>),
}

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub ingest: IngestMode,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct StatusBody {
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &bizscout_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database operation failed");
    ApiError::new(request_id, "internal_error", "database operation failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/scrape", post(scrape::scrape))
        .route("/api/v1/ingest", post(ingest::trigger_ingest))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health() -> Json<StatusBody> {
    Json(StatusBody { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use bizscout_core::ScraperSettings;
    use bizscout_scraper::Fetcher;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_state(ingest: IngestMode) -> AppState {
        let settings = ScraperSettings {
            http_timeout_seconds: 5.0,
            http_retry_backoff_seconds: 0.01,
            request_max_urls: 3,
            ..ScraperSettings::default()
        };
        let fetcher = Fetcher::with_seed(&settings, 9).expect("fetcher");
        AppState {
            coordinator: Arc::new(Coordinator::with_fetcher(settings, fetcher)),
            ingest,
        }
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        let cases = [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("bad_request", StatusCode::BAD_REQUEST),
            ("service_unavailable", StatusCode::SERVICE_UNAVAILABLE),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req-1", code, "message").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[tokio::test]
    async fn health_returns_ok_and_echoes_request_id() {
        let app = build_app(test_state(IngestMode::NoDatabase));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "req-abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("req-abc")
        );
        assert_eq!(json_body(response).await, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn scrape_rejects_invalid_requests() {
        let bodies = [
            r#"{"urls": []}"#,
            r#"{"urls": ["listings.example.com"]}"#,
            r#"{"urls": ["https://a.example.com"], "maxConcurrency": 0}"#,
            r#"{"urls": ["https://a.example.com"], "maxConcurrency": 33}"#,
            r#"{"urls": ["https://a.example.com", "https://b.example.com", "https://c.example.com", "https://d.example.com"]}"#,
            r#"{"urls": "#,
        ];

        for body in bodies {
            let app = build_app(test_state(IngestMode::NoDatabase));
            let response = app
                .oneshot(post_json("/api/v1/scrape", body))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
            let json = json_body(response).await;
            assert!(json["error"]["message"].is_string(), "body {body}");
            assert!(json["meta"]["request_id"].is_string());
        }
    }

    #[tokio::test]
    async fn scrape_returns_result_triple() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/listings"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<html><head><script type="application/ld+json">{{
                    "@type": "LocalBusiness",
                    "name": "Riverside Cafe",
                    "url": "{}/listing/riverside-cafe",
                    "offers": {{"price": "£180,000"}}
                }}</script></head><body></body></html>"#,
                server.uri()
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let app = build_app(test_state(IngestMode::NoDatabase));
        let body = serde_json::json!({
            "urls": [
                format!("{}/listings", server.uri()),
                format!("{}/LISTINGS", server.uri()),
                format!("{}/forbidden", server.uri()),
            ],
            "maxConcurrency": 2
        });
        let response = app
            .oneshot(post_json("/api/v1/scrape", &body.to_string()))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["meta"]["totalRequested"], 2);
        assert_eq!(json["meta"]["totalSucceeded"], 1);
        assert_eq!(json["meta"]["totalBusinesses"], 1);
        assert_eq!(json["businesses"][0]["title"], "Riverside Cafe");
        assert_eq!(json["businesses"][0]["extractionMethod"], 1);
        assert_eq!(json["errors"][0]["stage"], "fetch");
    }

    #[tokio::test]
    async fn ingest_is_unavailable_without_database_or_scheduler() {
        for (mode, message) in [
            (IngestMode::NoDatabase, "database not configured"),
            (IngestMode::Disabled, "scheduler is disabled"),
        ] {
            let app = build_app(test_state(mode));
            let response = app
                .oneshot(post_json("/api/v1/ingest", ""))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            let json = json_body(response).await;
            assert_eq!(json["error"]["message"], message);
        }
    }
}
