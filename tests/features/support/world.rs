//! Test world for Cucumber scenarios

use std::collections::HashMap;
use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use cucumber::World;
use serde_json::{json, Value};
use tower::ServiceExt;

use exchange_portal::{api, config::AppConfig, db::MemoryRepository, AppState};

/// Test world that maintains state across scenario steps
#[derive(World)]
#[world(init = Self::new)]
pub struct TestWorld {
    pub state: AppState,
    router: Router,

    /// Institution ids by scenario name
    pub institutions: HashMap<String, String>,

    /// Request ids by title
    pub requests: HashMap<String, String>,

    /// Notification ids by title
    pub notifications: HashMap<String, String>,

    /// Response from last API call
    pub last_response: Option<TestResponse>,
}

impl std::fmt::Debug for TestWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestWorld")
            .field("institutions", &self.institutions)
            .field("requests", &self.requests)
            .field("last_response", &self.last_response)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: u16,
    pub body: Value,
}

impl TestWorld {
    /// Fresh portal on the in-memory repository
    pub fn new() -> Self {
        let state = AppState::new(AppConfig::default(), Arc::new(MemoryRepository::new()));
        let router = Router::new()
            .nest("/api/v1", api::routes())
            .with_state(state.clone());

        Self {
            state,
            router,
            institutions: HashMap::new(),
            requests: HashMap::new(),
            notifications: HashMap::new(),
            last_response: None,
        }
    }

    /// Send a request and keep the response
    pub async fn send(&mut self, method: &str, uri: &str, body: Option<Value>) -> &TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        self.last_response.insert(TestResponse { status, body })
    }

    pub fn response(&self) -> &TestResponse {
        self.last_response.as_ref().expect("No response available")
    }

    pub fn institution_id(&self, name: &str) -> String {
        self.institutions
            .get(name)
            .unwrap_or_else(|| panic!("unknown institution {}", name))
            .clone()
    }

    pub fn request_id(&self, title: &str) -> String {
        self.requests
            .get(title)
            .unwrap_or_else(|| panic!("unknown request {}", title))
            .clone()
    }

    /// Register an institution through the API
    pub async fn register_institution(&mut self, name: &str) -> String {
        let payload = json!({
            "name": name,
            "organizationType": "agency",
            "contact": {
                "contactPerson": "Focal Point",
                "email": Self::contact_email(name)
            },
            "apiEndpoint": format!("https://{}.example.org/api", Self::slug(name)),
            "userId": "registrar"
        });
        let response = self.send("POST", "/api/v1/institutions", Some(payload)).await;
        assert_eq!(response.status, 201, "register failed: {}", response.body);
        let id = response.body["id"].as_str().unwrap().to_string();
        self.institutions.insert(name.to_string(), id.clone());
        id
    }

    /// Change an institution's status through the API
    pub async fn set_institution_status(&mut self, name: &str, status: &str, actor: &str) {
        let id = self.institution_id(name);
        self.send(
            "PATCH",
            &format!("/api/v1/institutions/{}", id),
            Some(json!({ "status": status, "userId": actor })),
        )
        .await;
    }

    pub fn contact_email(name: &str) -> String {
        format!("contact@{}.example.org", Self::slug(name))
    }

    fn slug(name: &str) -> String {
        name.to_lowercase().replace(' ', "-")
    }
}
