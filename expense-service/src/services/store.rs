//! Collection-level persistence seam.
//!
//! Services talk to [`DocumentStore`] rather than to the driver so the same
//! code runs against MongoDB in production and against [`MemoryCollection`]
//! in tests and `STORE_BACKEND=memory` deployments. Filters are BSON documents
//! holding top-level equality conditions only.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, Bson, Document},
    error::{ErrorKind, WriteFailure},
    Collection,
};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::RwLock;
use thiserror::Error;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Document codec error: {0}")]
    Codec(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("MongoDB error: {0}")]
    Mongo(mongodb::error::Error),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
            if write_error.code == DUPLICATE_KEY_CODE {
                return StoreError::DuplicateKey(write_error.message.clone());
            }
        }
        StoreError::Mongo(err)
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(err: bson::de::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}

#[async_trait]
pub trait DocumentStore<T>: Send + Sync {
    async fn insert_one(&self, item: &T) -> Result<(), StoreError>;

    async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError>;

    async fn find(&self, filter: Document) -> Result<Vec<T>, StoreError>;

    async fn count(&self, filter: Document) -> Result<u64, StoreError>;

    /// Replace the first match. Returns whether a document matched.
    async fn replace_one(&self, filter: Document, item: &T) -> Result<bool, StoreError>;

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError>;
}

/// MongoDB-backed collection.
pub struct MongoCollection<T: Send + Sync> {
    inner: Collection<T>,
}

impl<T: Send + Sync> MongoCollection<T> {
    pub fn new(inner: Collection<T>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T> DocumentStore<T> for MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    async fn insert_one(&self, item: &T) -> Result<(), StoreError> {
        self.inner.insert_one(item, None).await?;
        Ok(())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError> {
        Ok(self.inner.find_one(filter, None).await?)
    }

    async fn find(&self, filter: Document) -> Result<Vec<T>, StoreError> {
        let cursor = self.inner.find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, filter: Document) -> Result<u64, StoreError> {
        Ok(self.inner.count_documents(filter, None).await?)
    }

    async fn replace_one(&self, filter: Document, item: &T) -> Result<bool, StoreError> {
        let result = self.inner.replace_one(filter, item, None).await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError> {
        let result = self.inner.delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }
}

/// In-process collection. Documents are kept in their BSON form so filters
/// and unique keys behave like the MongoDB indexes declared in
/// `MongoDb::initialize_indexes`.
pub struct MemoryCollection<T> {
    documents: RwLock<Vec<Document>>,
    unique_keys: Vec<Vec<&'static str>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            unique_keys: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Add a unique (possibly compound) key. `_id` is always unique.
    pub fn with_unique(mut self, fields: &[&'static str]) -> Self {
        self.unique_keys.push(fields.to_vec());
        self
    }

    fn violated_key(&self, candidate: &Document, others: &[&Document]) -> Option<String> {
        let id_key: &[&str] = &["_id"];
        std::iter::once(id_key)
            .chain(self.unique_keys.iter().map(Vec::as_slice))
            .find(|fields| {
                others
                    .iter()
                    .any(|other| fields.iter().all(|f| field(other, f) == field(candidate, f)))
            })
            .map(|fields| format!("duplicate value for ({})", fields.join(", ")))
    }
}

fn field<'a>(doc: &'a Document, key: &str) -> &'a Bson {
    doc.get(key).unwrap_or(&Bson::Null)
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| field(doc, key) == value)
}

fn poisoned<E>(_: E) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl<T> DocumentStore<T> for MemoryCollection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn insert_one(&self, item: &T) -> Result<(), StoreError> {
        let doc = bson::to_document(item)?;
        let mut documents = self.documents.write().map_err(poisoned)?;
        let existing: Vec<&Document> = documents.iter().collect();
        if let Some(violation) = self.violated_key(&doc, &existing) {
            return Err(StoreError::DuplicateKey(violation));
        }
        documents.push(doc);
        Ok(())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>, StoreError> {
        let documents = self.documents.read().map_err(poisoned)?;
        documents
            .iter()
            .find(|doc| matches(doc, &filter))
            .map(|doc| bson::from_document(doc.clone()).map_err(StoreError::from))
            .transpose()
    }

    async fn find(&self, filter: Document) -> Result<Vec<T>, StoreError> {
        let documents = self.documents.read().map_err(poisoned)?;
        documents
            .iter()
            .filter(|doc| matches(doc, &filter))
            .map(|doc| bson::from_document(doc.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn count(&self, filter: Document) -> Result<u64, StoreError> {
        let documents = self.documents.read().map_err(poisoned)?;
        Ok(documents.iter().filter(|doc| matches(doc, &filter)).count() as u64)
    }

    async fn replace_one(&self, filter: Document, item: &T) -> Result<bool, StoreError> {
        let doc = bson::to_document(item)?;
        let mut documents = self.documents.write().map_err(poisoned)?;
        let Some(position) = documents.iter().position(|d| matches(d, &filter)) else {
            return Ok(false);
        };
        let others: Vec<&Document> = documents
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, d)| d)
            .collect();
        if let Some(violation) = self.violated_key(&doc, &others) {
            return Err(StoreError::DuplicateKey(violation));
        }
        documents[position] = doc;
        Ok(true)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, StoreError> {
        let mut documents = self.documents.write().map_err(poisoned)?;
        let before = documents.len();
        documents.retain(|doc| !matches(doc, &filter));
        Ok((before - documents.len()) as u64)
    }
}
