mod common;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration as ChronoDuration, Utc};
use common::{error_code, TestApp, PASSWORD};
use expense_service::{
    config::ExpenseConfig,
    models::Member,
    services::{DocumentStore, StoreError},
};
use mongodb::bson::{doc, Document};
use std::{sync::Arc, time::Duration};

/// Store that answers every lookup and count late.
struct SlowStore<T> {
    inner: Arc<dyn DocumentStore<T>>,
    delay: Duration,
}

#[async_trait]
impl<T: Send + Sync + 'static> DocumentStore<T> for SlowStore<T> {
    async fn insert_one(&self, item: &T) -> Result<(), StoreError> {
        self.inner.insert_one(item).await
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_one(filter).await
    }

    async fn find(&self, filter: Document) -> Result<Vec<T>, StoreError> {
        self.inner.find(filter).await
    }

    async fn count(&self, filter: Document) -> Result<u64, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.count(filter).await
    }

    async fn replace_one(&self, filter: Document, item: &T) -> Result<bool, StoreError> {
        self.inner.replace_one(filter, item).await
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError> {
        self.inner.delete_many(filter).await
    }
}

async fn member_by_email(app: &TestApp, email: &str) -> Member {
    app.db()
        .members
        .find_one(doc! { "email": email })
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_missing_or_malformed_header_is_no_token() {
    let app = TestApp::new();

    let (status, body) = app
        .request(axum::http::Method::GET, "/auth/me", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "no_token");

    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "no_token");
}

#[tokio::test]
async fn test_garbage_and_tampered_tokens_are_invalid() {
    let app = TestApp::new();
    let (token, _) = app.register("Acme", "Alice", "alice@x.com").await;

    let (status, body) = app.get("/auth/me", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "invalid_token");

    let signature_at = token.rfind('.').unwrap() + 5;
    let mut tampered: Vec<char> = token.chars().collect();
    tampered[signature_at] = if tampered[signature_at] == 'A' { 'B' } else { 'A' };
    let tampered: String = tampered.into_iter().collect();
    let (status, body) = app.get("/auth/me", &tampered).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "invalid_token");
}

#[tokio::test]
async fn test_expired_token_is_invalid() {
    let app = TestApp::new();
    app.register("Acme", "Alice", "alice@x.com").await;
    let alice = member_by_email(&app, "alice@x.com").await;

    let issued = Utc::now() - ChronoDuration::hours(5) - ChronoDuration::seconds(5);
    let expired = app.state.jwt.issue_at(&alice, issued).unwrap();

    let (status, body) = app.get("/auth/me", &expired).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "invalid_token");
}

#[tokio::test]
async fn test_deleted_member_token_is_stale() {
    let app = TestApp::new();
    let (head_token, _) = app.register("Acme", "Alice", "alice@x.com").await;
    let (bob_id, bob_token) = app
        .add_member(&head_token, "Bob", "bob@x.com", "Member")
        .await;

    app.db()
        .members
        .delete_many(doc! { "_id": bob_id.as_str() })
        .await
        .unwrap();

    let (status, body) = app.get("/auth/me", &bob_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "stale_token");
}

#[tokio::test]
async fn test_family_change_makes_token_stale() {
    let app = TestApp::new();
    let (token, _) = app.register("Acme", "Alice", "alice@x.com").await;

    let mut alice = member_by_email(&app, "alice@x.com").await;
    alice.family_id = Some("some-other-family".to_string());
    app.db()
        .members
        .replace_one(doc! { "_id": alice.id.as_str() }, &alice)
        .await
        .unwrap();

    let (status, body) = app.get("/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "stale_token");
}

#[tokio::test]
async fn test_deleted_role_is_role_missing() {
    let app = TestApp::new();
    let (head_token, _) = app.register("Acme", "Alice", "alice@x.com").await;
    let (_, bob_token) = app
        .add_member(&head_token, "Bob", "bob@x.com", "Member")
        .await;

    let member_role = app.role_id(&head_token, "Member").await;
    app.db()
        .roles
        .delete_many(doc! { "_id": member_role.as_str() })
        .await
        .unwrap();

    let (status, body) = app.get("/auth/me", &bob_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "role_missing");

    let (status, body) = app.login("bob@x.com", common::PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "role_missing");
}

#[tokio::test]
async fn test_cross_family_role_is_integrity_error() {
    let app = TestApp::new();
    let (acme_token, _) = app.register("Acme", "Alice", "alice@x.com").await;
    let (globex_token, _) = app.register("Globex", "Gina", "gina@x.com").await;

    let globex_head = app.role_id(&globex_token, "Head").await;
    let mut alice = member_by_email(&app, "alice@x.com").await;
    alice.role_id = globex_head;
    app.db()
        .members
        .replace_one(doc! { "_id": alice.id.as_str() }, &alice)
        .await
        .unwrap();

    let (status, body) = app.get("/auth/me", &acme_token).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "integrity_error");
    assert!(!body.to_string().contains("Globex"));
}

#[tokio::test]
async fn test_slow_store_is_unavailable_not_unauthorized() {
    let app = TestApp::new();
    let (token, _) = app.register("Acme", "Alice", "alice@x.com").await;

    let mut db = app.db().clone();
    db.members = Arc::new(SlowStore {
        inner: app.db().members.clone(),
        delay: Duration::from_millis(500),
    });
    let mut config = ExpenseConfig::for_testing();
    config.store.timeout_ms = 50;
    let slow_app = TestApp::with_config(config, db);

    let (status, body) = slow_app.get("/auth/me", &token).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "store_unavailable");

    let (status, body) = slow_app.login("alice@x.com", PASSWORD).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "store_unavailable");
}

#[tokio::test]
async fn test_login_with_slow_role_lookup_is_unavailable() {
    let app = TestApp::new();
    let (token, _) = app.register("Acme", "Alice", "alice@x.com").await;

    let mut db = app.db().clone();
    db.roles = Arc::new(SlowStore {
        inner: app.db().roles.clone(),
        delay: Duration::from_millis(1500),
    });
    let mut config = ExpenseConfig::for_testing();
    config.store.timeout_ms = 50;
    let slow_app = TestApp::with_config(config, db);

    let (status, _) = slow_app.get("/auth/me", &token).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = slow_app.login("alice@x.com", PASSWORD).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "store_unavailable");
}

#[tokio::test]
async fn test_setup_status_with_slow_store_is_unavailable() {
    let app = TestApp::new();
    let mut db = app.db().clone();
    db.members = Arc::new(SlowStore {
        inner: app.db().members.clone(),
        delay: Duration::from_millis(500),
    });
    let mut config = ExpenseConfig::for_testing();
    config.store.timeout_ms = 50;
    let slow_app = TestApp::with_config(config, db);

    let (status, body) = slow_app
        .request(Method::GET, "/setup/status", None, None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "store_unavailable");
}

#[tokio::test]
async fn test_permission_changes_apply_to_existing_tokens() {
    let app = TestApp::new();
    let (head_token, _) = app.register("Acme", "Alice", "alice@x.com").await;
    let (_, bob_token) = app
        .add_member(&head_token, "Bob", "bob@x.com", "Member")
        .await;

    let (status, _) = app.get("/audit", &bob_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let member_role = app.role_id(&head_token, "Member").await;
    let (status, _) = app
        .patch(
            &format!("/roles/{}", member_role),
            &head_token,
            serde_json::json!({ "permissions": ["audit:view"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/audit", &bob_token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/dashboard", &bob_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
