mod common;

use axum::http::{Method, StatusCode};
use common::{error_code, token_of, TestApp, PASSWORD};
use expense_service::models::{Permission, SYSTEM_ADMIN_ROLE_ID};
use mongodb::bson::doc;
use serde_json::{json, Value};

async fn create_admin(app: &TestApp, email: &str) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        "/setup/create-admin",
        None,
        Some(json!({ "name": "Root", "email": email, "password": PASSWORD })),
    )
    .await
}

#[tokio::test]
async fn test_create_admin_only_once() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/setup/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["initialized"], false);

    let (status, admin) = create_admin(&app, "root@x.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(admin["user"]["role"], "System Administrator");
    assert!(admin["user"]["family_id"].is_null());
    assert_eq!(
        admin["user"]["permissions"].as_array().unwrap().len(),
        Permission::ALL.len()
    );

    let (status, body) = create_admin(&app, "second@x.com").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "already_initialized");

    let admins = app
        .db()
        .members
        .count(doc! { "role_id": SYSTEM_ADMIN_ROLE_ID })
        .await
        .unwrap();
    assert_eq!(admins, 1);
    assert_eq!(app.db().members.count(doc! {}).await.unwrap(), 1);
    assert_eq!(
        app.db()
            .roles
            .count(doc! { "_id": SYSTEM_ADMIN_ROLE_ID })
            .await
            .unwrap(),
        1
    );

    let (_, body) = app.request(Method::GET, "/setup/status", None, None).await;
    assert_eq!(body["initialized"], true);
}

#[tokio::test]
async fn test_create_admin_refused_after_registration() {
    let app = TestApp::new();
    app.register("Acme", "Alice", "alice@x.com").await;

    let (status, body) = create_admin(&app, "root@x.com").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "already_initialized");
    assert_eq!(
        app.db()
            .roles
            .count(doc! { "_id": SYSTEM_ADMIN_ROLE_ID })
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_invalid_admin_request_does_not_lock_bootstrap() {
    let app = TestApp::new();

    let (status, _) = app
        .request(
            Method::POST,
            "/setup/create-admin",
            None,
            Some(json!({ "name": "Root", "email": "root@x.com", "password": "weak" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create_admin(&app, "root@x.com").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_admin_sees_every_family_but_cannot_create_family_resources() {
    let app = TestApp::new();
    let (_, admin) = create_admin(&app, "root@x.com").await;
    let admin_token = token_of(&admin);

    // A family can still register after bootstrap.
    app.register("Acme", "Alice", "alice@x.com").await;
    app.register("Globex", "Gina", "gina@x.com").await;

    let (status, members) = app.get("/members", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 3);

    let (status, body) = app
        .post(
            "/roles",
            &admin_token,
            json!({ "name": "Auditor", "permissions": ["audit:view"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "family_required");
}
