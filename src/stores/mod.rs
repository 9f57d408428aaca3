//! Storage boundary for chunk vectors and metadata.
//!
//! The engine never owns chunks once written; the external vector engine
//! does. This module defines the [`VectorStore`] trait every backend speaks,
//! so the rest of the crate works against one interface:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorStore trait│
//!                  │   (async CRUD)   │
//!                  └────────┬─────────┘
//!                           │
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!      ┌───────────────┐        ┌────────────────┐
//!      │ WeaviateStore │        │ MemoryVector-  │
//!      │  (HTTP API)   │        │ Store (tests)  │
//!      └───────────────┘        └────────────────┘
//! ```
//!
//! Two fetch interfaces exist side by side because the HTTP engine's access
//! API has drifted across versions: [`VectorStore::fetch_all`] speaks the
//! newer structured interface, [`VectorStore::fetch_all_legacy`] the older
//! query language with a differently shaped response. The document eraser
//! relies on both staying alive independently.

pub mod memory;
pub mod weaviate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunking::PolicyChunk;
use crate::types::EngineError;

pub use memory::MemoryVectorStore;
pub use weaviate::WeaviateStore;

/// One property of a collection schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub data_type: String,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A named collection layout. Created once, lazily; never migrated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub properties: Vec<PropertySpec>,
}

impl CollectionSchema {
    /// The chunk schema every policy collection uses.
    pub fn policy_chunks(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: vec![
                PropertySpec::new("text", "text"),
                PropertySpec::new("source", "text"),
                PropertySpec::new("page", "int"),
                PropertySpec::new("policy_category", "text"),
                PropertySpec::new("last_updated", "date"),
            ],
        }
    }
}

/// Wire-level chunk metadata, as stored alongside the vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkProperties {
    pub text: String,
    pub source: String,
    pub page: u32,
    pub policy_category: String,
    pub last_updated: String,
}

impl From<PolicyChunk> for ChunkProperties {
    fn from(chunk: PolicyChunk) -> Self {
        Self {
            text: chunk.text,
            source: chunk.source,
            page: chunk.page,
            policy_category: chunk.category.as_str().to_string(),
            last_updated: chunk.last_updated,
        }
    }
}

/// A chunk with its vector, ready for insertion. Ids are assigned by the
/// store at insert time.
#[derive(Clone, Debug)]
pub struct NewObject {
    pub properties: ChunkProperties,
    pub vector: Vec<f32>,
}

/// A chunk read back from the store, with its assigned id.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    pub id: String,
    pub properties: ChunkProperties,
}

/// Equality filters the boundary supports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyFilter {
    SourceEquals(String),
    CategoryEquals(String),
}

impl PropertyFilter {
    /// Schema property the filter applies to.
    pub fn property(&self) -> &'static str {
        match self {
            PropertyFilter::SourceEquals(_) => "source",
            PropertyFilter::CategoryEquals(_) => "policy_category",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            PropertyFilter::SourceEquals(value) | PropertyFilter::CategoryEquals(value) => value,
        }
    }

    /// True when the stored properties satisfy the filter.
    pub fn matches(&self, properties: &ChunkProperties) -> bool {
        match self {
            PropertyFilter::SourceEquals(value) => properties.source == *value,
            PropertyFilter::CategoryEquals(value) => properties.policy_category == *value,
        }
    }
}

/// Unified interface over chunk storage backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent get-or-create. Fails with [`EngineError::SchemaConflict`]
    /// when the collection exists with mismatched property names or types.
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), EngineError>;

    /// Writes every object with its vector and returns the assigned ids, one
    /// per input object, in input order.
    async fn insert_batch(
        &self,
        collection: &str,
        objects: Vec<NewObject>,
    ) -> Result<Vec<String>, EngineError>;

    /// Deletes a single object. Deleting an id that no longer exists is not
    /// an error.
    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<(), EngineError>;

    /// Nearest-neighbor search by the store's distance metric, nearest first,
    /// ties in the store's native order.
    async fn search_near_vector(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&PropertyFilter>,
    ) -> Result<Vec<StoredObject>, EngineError>;

    /// Filtered metadata fetch through the newer structured interface.
    async fn fetch_all(
        &self,
        collection: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, EngineError>;

    /// The same fetch through the older query language. Response shapes
    /// differ per interface generation; each backend adapts its own.
    async fn fetch_all_legacy(
        &self,
        collection: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, EngineError>;

    /// Probes whether the store is reachable and ready.
    async fn ready(&self) -> Result<(), EngineError>;
}
