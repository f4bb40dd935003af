mod common;

use axum::http::StatusCode;
use common::{error_code, TestApp, PASSWORD};
use expense_service::models::Permission;
use serde_json::json;

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = TestApp::new();

    let (_, registered) = app.register("Acme", "Alice", "alice@x.com").await;
    assert_eq!(registered["token_type"], "Bearer");
    assert_eq!(registered["expires_in"], 5 * 3600);
    assert_eq!(registered["user"]["role"], "Head");
    assert!(registered["user"].get("password_hash").is_none());

    let (status, session) = app.login("alice@x.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    let token = common::token_of(&session);

    let (status, me) = app.get("/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Alice");
    assert_eq!(me["email"], "alice@x.com");
    assert_eq!(me["role"], "Head");

    let permissions = me["permissions"].as_array().unwrap();
    assert_eq!(permissions.len(), Permission::ALL.len());
    assert!(permissions.contains(&json!("roles:manage")));
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn test_member_without_delete_permission_is_forbidden() {
    let app = TestApp::new();
    let (alice_token, registered) = app.register("Acme", "Alice", "alice@x.com").await;
    let alice_id = registered["user"]["id"].as_str().unwrap().to_string();

    let (bob_id, bob_token) = app
        .add_member(&alice_token, "Bob", "bob@x.com", "Member")
        .await;

    let (status, me) = app.get("/auth/me", &bob_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "Member");
    assert!(!me["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("members:delete")));

    let (status, body) = app.delete(&format!("/members/{}", alice_id), &bob_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "forbidden");

    let (status, _) = app.delete(&format!("/members/{}", bob_id), &bob_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, members) = app.get("/members", &alice_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let app = TestApp::new();
    app.register("Acme", "Alice", "alice@x.com").await;

    let (wrong_password, body_a) = app.login("alice@x.com", "Wr0ng-pass").await;
    let (unknown_email, body_b) = app.login("nobody@x.com", PASSWORD).await;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a, body_b);
    assert_eq!(error_code(&body_a), "invalid_credentials");

    for (email, password) in [("not-an-email", PASSWORD), ("alice@x.com", "")] {
        let (status, body) = app.login(email, password).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} / {:?}", email, password);
        assert_eq!(body, body_a);
    }
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::new();
    app.register("Acme", "Alice", "Alice@X.com").await;

    let (status, _) = app.login("ALICE@x.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_email_conflicts() {
    let app = TestApp::new();
    app.register("Acme", "Alice", "alice@x.com").await;

    let (status, body) = app
        .request(
            axum::http::Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "family_name": "Other",
                "name": "Alice Two",
                "email": "ALICE@x.com",
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "email_taken");
}

#[tokio::test]
async fn test_registration_rejects_weak_password() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            axum::http::Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "family_name": "Acme",
                "name": "Alice",
                "email": "alice@x.com",
                "password": "NoSymbol123",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");

    let (status, setup) = app
        .request(axum::http::Method::GET, "/setup/status", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(setup["initialized"], false);
}

#[tokio::test]
async fn test_update_profile_and_change_password() {
    let app = TestApp::new();
    let (token, _) = app.register("Acme", "Alice", "alice@x.com").await;

    let (status, profile) = app
        .patch(
            "/auth/me",
            &token,
            json!({ "name": "Alice Smith", "phone": "555-0100" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Alice Smith");
    assert_eq!(profile["phone"], "555-0100");
    assert_eq!(profile["role"], "Head");

    // Role and family are not part of the self-service profile.
    let (status, _) = app
        .patch("/auth/me", &token, json!({ "role_id": "system-administrator" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/auth/me/password",
            &token,
            json!({ "current_password": "Wr0ng-pass", "new_password": "N3w-Secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");

    let (status, _) = app
        .post(
            "/auth/me/password",
            &token,
            json!({ "current_password": PASSWORD, "new_password": "N3w-Secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.login("alice@x.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("alice@x.com", "N3w-Secret").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_registration_seeds_roles_and_categories() {
    let app = TestApp::new();
    let (token, _) = app.register("Acme", "Alice", "alice@x.com").await;

    let (status, roles) = app.get("/roles", &token).await;
    assert_eq!(status, StatusCode::OK);
    let mut names: Vec<&str> = roles
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Head", "Manager", "Member"]);

    let (status, categories) = app.get("/categories", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories.as_array().unwrap().len(), 12);

    let (status, catalog) = app.get("/roles/permissions", &token).await;
    assert_eq!(status, StatusCode::OK);
    let catalogued: usize = catalog["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["permissions"].as_array().unwrap().len())
        .sum();
    assert_eq!(catalogued, Permission::ALL.len());
}
