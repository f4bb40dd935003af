mod common;

use axum::http::StatusCode;
use common::{error_code, TestApp};
use serde_json::{json, Value};

async fn add_expenses(app: &TestApp, token: &str, count: usize) -> Vec<String> {
    let category = app.category_id(token, "Groceries").await;
    let mut ids = Vec::new();
    for i in 0..count {
        let (status, body) = app
            .post(
                "/transactions",
                token,
                json!({
                    "kind": "expense",
                    "amount": 10.0 + i as f64,
                    "description": format!("purchase {}", i),
                    "category_id": category,
                    "date": "2024-05-01",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        ids.push(body["_id"].as_str().unwrap().to_string());
    }
    ids
}

fn family_ids(rows: &Value) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["family_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_transaction_lists_never_cross_families() {
    let app = TestApp::new();
    let (acme, acme_body) = app.register("Acme", "Alice", "alice@x.com").await;
    let (globex, globex_body) = app.register("Globex", "Gina", "gina@x.com").await;
    let acme_family = acme_body["user"]["family_id"].as_str().unwrap();
    let globex_family = globex_body["user"]["family_id"].as_str().unwrap();

    add_expenses(&app, &acme, 7).await;
    add_expenses(&app, &globex, 11).await;

    let (status, rows) = app.get("/transactions", &acme).await;
    assert_eq!(status, StatusCode::OK);
    let families = family_ids(&rows);
    assert_eq!(families.len(), 7);
    assert!(families.iter().all(|f| f == acme_family));

    let (_, rows) = app.get("/transactions", &globex).await;
    let families = family_ids(&rows);
    assert_eq!(families.len(), 11);
    assert!(families.iter().all(|f| f == globex_family));
}

#[tokio::test]
async fn test_other_family_resources_are_not_found() {
    let app = TestApp::new();
    let (acme, _) = app.register("Acme", "Alice", "alice@x.com").await;
    let (globex, globex_body) = app.register("Globex", "Gina", "gina@x.com").await;

    let globex_tx = add_expenses(&app, &globex, 1).await.remove(0);
    let globex_member = globex_body["user"]["id"].as_str().unwrap().to_string();
    let globex_role = app.role_id(&globex, "Manager").await;
    let globex_category = app.category_id(&globex, "Housing").await;

    for uri in [
        format!("/transactions/{}", globex_tx),
        format!("/members/{}", globex_member),
    ] {
        let (status, body) = app.get(&uri, &acme).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(error_code(&body), "not_found");
    }

    let (status, _) = app.delete(&format!("/transactions/{}", globex_tx), &acme).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/members/{}", globex_member), &acme).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/roles/{}", globex_role), &acme).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .patch(
            &format!("/categories/{}", globex_category),
            &acme,
            json!({ "name": "Mine now" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Still intact for its owners.
    let (status, _) = app.get(&format!("/transactions/{}", globex_tx), &globex).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_family_cannot_be_taken_from_body() {
    let app = TestApp::new();
    let (acme, _) = app.register("Acme", "Alice", "alice@x.com").await;
    let (_, globex_body) = app.register("Globex", "Gina", "gina@x.com").await;
    let globex_family = globex_body["user"]["family_id"].as_str().unwrap();

    let category = app.category_id(&acme, "Groceries").await;
    let (status, body) = app
        .post(
            "/transactions",
            &acme,
            json!({
                "kind": "expense",
                "amount": 5.0,
                "category_id": category,
                "date": "2024-05-01",
                "family_id": globex_family,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");

    let role_id = app.role_id(&acme, "Member").await;
    let (status, _) = app
        .post(
            "/members",
            &acme,
            json!({
                "name": "Mallory",
                "email": "mallory@x.com",
                "password": common::PASSWORD,
                "role_id": role_id,
                "family_id": globex_family,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_foreign_category_reference_is_bad_request() {
    let app = TestApp::new();
    let (acme, _) = app.register("Acme", "Alice", "alice@x.com").await;
    let (globex, _) = app.register("Globex", "Gina", "gina@x.com").await;
    let globex_category = app.category_id(&globex, "Groceries").await;

    let (status, body) = app
        .post(
            "/transactions",
            &acme,
            json!({
                "kind": "expense",
                "amount": 5.0,
                "category_id": globex_category,
                "date": "2024-05-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");

    let (status, _) = app
        .post(
            "/budgets",
            &acme,
            json!({ "category_id": globex_category, "amount": 100.0, "period": "monthly" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
