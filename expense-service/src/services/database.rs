use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database as MongoDatabase,
    IndexModel,
};
use service_core::error::AppError;
use std::sync::Arc;

use super::store::{DocumentStore, MemoryCollection, MongoCollection};
use crate::models::{
    ApprovalRequest, AuditEntry, Budget, Category, Family, Member, Role, Subscription, Transaction,
    Trip,
};

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: MongoDatabase,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for expense-service");

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("member_email_unique".to_string())
                    .build(),
            )
            .build();
        self.members()
            .create_index(email_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create email index on members collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on members.email");

        let role_name_index = IndexModel::builder()
            .keys(doc! { "family_id": 1, "name": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("role_family_name_unique".to_string())
                    .build(),
            )
            .build();
        self.roles()
            .create_index(role_name_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create name index on roles collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on roles.(family_id, name)");

        for collection in [
            "members",
            "categories",
            "transactions",
            "budgets",
            "trips",
            "subscriptions",
            "approvals",
            "audit_logs",
        ] {
            let family_index = IndexModel::builder()
                .keys(doc! { "family_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("family_lookup".to_string())
                        .build(),
                )
                .build();
            self.db
                .collection::<mongodb::bson::Document>(collection)
                .create_index(family_index, None)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to create family index on {} collection: {}",
                        collection,
                        e
                    );
                    AppError::from(e)
                })?;
        }
        tracing::info!("Created family_id indexes on tenant collections");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn families(&self) -> Collection<Family> {
        self.db.collection("families")
    }

    pub fn members(&self) -> Collection<Member> {
        self.db.collection("members")
    }

    pub fn roles(&self) -> Collection<Role> {
        self.db.collection("roles")
    }

    pub fn categories(&self) -> Collection<Category> {
        self.db.collection("categories")
    }

    pub fn transactions(&self) -> Collection<Transaction> {
        self.db.collection("transactions")
    }

    pub fn budgets(&self) -> Collection<Budget> {
        self.db.collection("budgets")
    }

    pub fn trips(&self) -> Collection<Trip> {
        self.db.collection("trips")
    }

    pub fn subscriptions(&self) -> Collection<Subscription> {
        self.db.collection("subscriptions")
    }

    pub fn approvals(&self) -> Collection<ApprovalRequest> {
        self.db.collection("approvals")
    }

    pub fn audit_logs(&self) -> Collection<AuditEntry> {
        self.db.collection("audit_logs")
    }
}

/// One store per collection. Fields are public so tests can swap a single
/// collection for a failing double.
#[derive(Clone)]
pub struct Database {
    pub families: Arc<dyn DocumentStore<Family>>,
    pub members: Arc<dyn DocumentStore<Member>>,
    pub roles: Arc<dyn DocumentStore<Role>>,
    pub categories: Arc<dyn DocumentStore<Category>>,
    pub transactions: Arc<dyn DocumentStore<Transaction>>,
    pub budgets: Arc<dyn DocumentStore<Budget>>,
    pub trips: Arc<dyn DocumentStore<Trip>>,
    pub subscriptions: Arc<dyn DocumentStore<Subscription>>,
    pub approvals: Arc<dyn DocumentStore<ApprovalRequest>>,
    pub audit_logs: Arc<dyn DocumentStore<AuditEntry>>,
    mongo: Option<MongoDb>,
}

impl Database {
    pub fn from_mongo(mongo: &MongoDb) -> Self {
        Self {
            families: Arc::new(MongoCollection::new(mongo.families())),
            members: Arc::new(MongoCollection::new(mongo.members())),
            roles: Arc::new(MongoCollection::new(mongo.roles())),
            categories: Arc::new(MongoCollection::new(mongo.categories())),
            transactions: Arc::new(MongoCollection::new(mongo.transactions())),
            budgets: Arc::new(MongoCollection::new(mongo.budgets())),
            trips: Arc::new(MongoCollection::new(mongo.trips())),
            subscriptions: Arc::new(MongoCollection::new(mongo.subscriptions())),
            approvals: Arc::new(MongoCollection::new(mongo.approvals())),
            audit_logs: Arc::new(MongoCollection::new(mongo.audit_logs())),
            mongo: Some(mongo.clone()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            families: Arc::new(MemoryCollection::<Family>::new()),
            members: Arc::new(MemoryCollection::<Member>::new().with_unique(&["email"])),
            roles: Arc::new(MemoryCollection::<Role>::new().with_unique(&["family_id", "name"])),
            categories: Arc::new(MemoryCollection::<Category>::new()),
            transactions: Arc::new(MemoryCollection::<Transaction>::new()),
            budgets: Arc::new(MemoryCollection::<Budget>::new()),
            trips: Arc::new(MemoryCollection::<Trip>::new()),
            subscriptions: Arc::new(MemoryCollection::<Subscription>::new()),
            approvals: Arc::new(MemoryCollection::<ApprovalRequest>::new()),
            audit_logs: Arc::new(MemoryCollection::<AuditEntry>::new()),
            mongo: None,
        }
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        match &self.mongo {
            Some(mongo) => mongo.health_check().await,
            None => Ok(()),
        }
    }
}
