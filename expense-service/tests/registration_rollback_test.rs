mod common;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use common::{TestApp, PASSWORD};
use expense_service::{
    models::{Category, Member, Role},
    services::{Database, DocumentStore, MemoryCollection, StoreError},
};
use mongodb::bson::{doc, Document};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Collection that accepts a fixed number of inserts and then fails.
struct FailingStore<T> {
    inner: MemoryCollection<T>,
    remaining_inserts: AtomicUsize,
}

impl<T> FailingStore<T> {
    fn new(allowed_inserts: usize) -> Self {
        Self {
            inner: MemoryCollection::new(),
            remaining_inserts: AtomicUsize::new(allowed_inserts),
        }
    }
}

#[async_trait]
impl<T> DocumentStore<T> for FailingStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn insert_one(&self, item: &T) -> Result<(), StoreError> {
        let allowed = self
            .remaining_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(StoreError::Unavailable("injected insert failure".to_string()));
        }
        self.inner.insert_one(item).await
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError> {
        self.inner.find_one(filter).await
    }

    async fn find(&self, filter: Document) -> Result<Vec<T>, StoreError> {
        self.inner.find(filter).await
    }

    async fn count(&self, filter: Document) -> Result<u64, StoreError> {
        self.inner.count(filter).await
    }

    async fn replace_one(&self, filter: Document, item: &T) -> Result<bool, StoreError> {
        self.inner.replace_one(filter, item).await
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError> {
        self.inner.delete_many(filter).await
    }
}

async fn assert_nothing_persisted(db: &Database) {
    assert_eq!(db.families.count(doc! {}).await.unwrap(), 0);
    assert_eq!(db.roles.count(doc! {}).await.unwrap(), 0);
    assert_eq!(db.categories.count(doc! {}).await.unwrap(), 0);
    assert_eq!(db.members.count(doc! {}).await.unwrap(), 0);
}

async fn register(app: &TestApp) -> StatusCode {
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "family_name": "Acme",
                "name": "Alice",
                "email": "alice@x.com",
                "password": PASSWORD,
            })),
        )
        .await;
    status
}

#[tokio::test]
async fn test_role_seeding_failure_rolls_back_everything() {
    for allowed in [0, 1, 2] {
        let mut db = Database::in_memory();
        db.roles = Arc::new(FailingStore::<Role>::new(allowed));
        let app = TestApp::with_database(db);

        let status = register(&app).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "allowed={}", allowed);
        assert_nothing_persisted(app.db()).await;
    }
}

#[tokio::test]
async fn test_category_seeding_failure_rolls_back_everything() {
    let mut db = Database::in_memory();
    db.categories = Arc::new(FailingStore::<Category>::new(5));
    let app = TestApp::with_database(db);

    assert_eq!(register(&app).await, StatusCode::SERVICE_UNAVAILABLE);
    assert_nothing_persisted(app.db()).await;
}

#[tokio::test]
async fn test_member_insert_failure_rolls_back_everything() {
    let mut db = Database::in_memory();
    db.members = Arc::new(FailingStore::<Member>::new(0));
    let app = TestApp::with_database(db);

    assert_eq!(register(&app).await, StatusCode::SERVICE_UNAVAILABLE);
    assert_nothing_persisted(app.db()).await;
}

#[tokio::test]
async fn test_complete_registration_persists_everything() {
    let app = TestApp::new();
    assert_eq!(register(&app).await, StatusCode::CREATED);

    assert_eq!(app.db().families.count(doc! {}).await.unwrap(), 1);
    assert_eq!(app.db().roles.count(doc! {}).await.unwrap(), 3);
    assert_eq!(app.db().categories.count(doc! {}).await.unwrap(), 12);
    assert_eq!(app.db().members.count(doc! {}).await.unwrap(), 1);
}
