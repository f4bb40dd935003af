//! Shared harness for expense-service integration tests.
//!
//! Builds the real router over the in-memory store and drives it with
//! `tower::ServiceExt::oneshot`; no external services are needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use expense_service::{build_router, config::ExpenseConfig, services::Database, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt;

pub const PASSWORD: &str = "Passw0rd!";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_database(Database::in_memory())
    }

    /// Build the app over a custom store set, e.g. one with a failing or slow
    /// collection swapped in.
    pub fn with_database(db: Database) -> Self {
        Self::with_config(ExpenseConfig::for_testing(), db)
    }

    pub fn with_config(config: ExpenseConfig, db: Database) -> Self {
        let state = AppState::new(config, db);
        let router = build_router(state.clone()).expect("Failed to build router");
        Self { state, router }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Send a request and return the status with the decoded JSON body
    /// (`Value::Null` for an empty body).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Register a family and return `(token, response body)`.
    pub async fn register(&self, family: &str, name: &str, email: &str) -> (String, Value) {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "family_name": family,
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (token_of(&body), body)
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Log in with the shared test password and return the token.
    pub async fn token_for(&self, email: &str) -> String {
        let (status, body) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        token_of(&body)
    }

    /// Id of a role in the caller's family by name.
    pub async fn role_id(&self, token: &str, name: &str) -> String {
        let (status, roles) = self.get("/roles", token).await;
        assert_eq!(status, StatusCode::OK);
        roles
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["name"] == name)
            .unwrap_or_else(|| panic!("role {} not found", name))["_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Create a member with the given starter role and return `(id, token)`.
    pub async fn add_member(
        &self,
        head_token: &str,
        name: &str,
        email: &str,
        role: &str,
    ) -> (String, String) {
        let role_id = self.role_id(head_token, role).await;
        let (status, body) = self
            .post(
                "/members",
                head_token,
                json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                    "role_id": role_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create member failed: {}", body);
        let id = body["id"].as_str().unwrap().to_string();
        (id, self.token_for(email).await)
    }

    /// Id of one of the family's categories by name.
    pub async fn category_id(&self, token: &str, name: &str) -> String {
        let (status, categories) = self.get("/categories", token).await;
        assert_eq!(status, StatusCode::OK);
        categories
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["name"] == name)
            .unwrap_or_else(|| panic!("category {} not found", name))["_id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

pub fn token_of(body: &Value) -> String {
    body["token"].as_str().expect("token in body").to_string()
}

pub fn error_code(body: &Value) -> &str {
    body["error"].as_str().unwrap_or_default()
}
