//! Test application setup utilities
//!
//! Builds the API router on top of an in-memory repository (or any other
//! repository) and drives it without a network listener.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use exchange_portal::{
    api,
    config::{AppConfig, DatabaseConfig},
    db, middleware, AppState, Repository,
};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application backed by the in-memory repository
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a new test application backed by an in-memory SQLite database
    pub async fn with_sqlite() -> Self {
        let mut config = test_config();
        config.database.url = "sqlite::memory:".to_string();
        Self::with_config(config).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let repo = db::init_repository(&config.database)
            .await
            .expect("Failed to initialize test repository");
        Self::with_repository(config, repo)
    }

    /// Build the application around an existing repository
    pub fn with_repository(config: AppConfig, repo: Arc<dyn Repository>) -> Self {
        let state = AppState::new(config, repo);

        let router = Router::new()
            .nest(
                "/api/v1",
                api::routes().layer(axum::middleware::from_fn(
                    middleware::api_cache_control_middleware,
                )),
            )
            .with_state(state.clone())
            .layer(axum::middleware::from_fn(
                middleware::security_headers_middleware,
            ));

        Self { router, state }
    }

    /// Make a GET request to the test application
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.json_request("POST", uri, body).await
    }

    /// Make a PUT request with JSON body
    pub async fn put_json(&self, uri: &str, body: Value) -> TestResponse {
        self.json_request("PUT", uri, body).await
    }

    /// Make a PATCH request with JSON body
    pub async fn patch_json(&self, uri: &str, body: Value) -> TestResponse {
        self.json_request("PATCH", uri, body).await
    }

    async fn json_request(&self, method: &str, uri: &str, body: Value) -> TestResponse {
        self.request(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register an institution and return its id
    pub async fn register_institution(&self, name: &str) -> String {
        let response = self
            .post_json("/api/v1/institutions", super::institution_payload(name))
            .await;
        response.assert_created();
        response.json::<Value>()["id"].as_str().unwrap().to_string()
    }

    /// Register and approve an institution, returning its id
    pub async fn approved_institution(&self, name: &str) -> String {
        let id = self.register_institution(name).await;
        self.patch_json(
            &format!("/api/v1/institutions/{}", id),
            json!({ "status": "approved", "userId": "admin-1" }),
        )
        .await
        .assert_ok();
        id
    }

    /// Submit a request and return its id
    pub async fn submit_request(&self, consumer_id: &str, provider_id: &str, title: &str) -> String {
        let response = self
            .post_json(
                "/api/v1/requests",
                super::request_payload(consumer_id, provider_id, title),
            )
            .await;
        response.assert_created();
        response.json::<Value>()["id"].as_str().unwrap().to_string()
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Error kind of an error response
    pub fn error_kind(&self) -> String {
        self.json::<Value>()["error"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_created(&self) -> &Self {
        self.assert_status(StatusCode::CREATED)
    }

    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    pub fn assert_conflict(&self) -> &Self {
        self.assert_status(StatusCode::CONFLICT)
    }
}

/// Configuration for tests: in-memory storage, default everything else
pub fn test_config() -> AppConfig {
    AppConfig {
        database: DatabaseConfig {
            url: "memory://".to_string(),
            max_connections: 1,
            ..DatabaseConfig::default()
        },
        ..AppConfig::default()
    }
}
