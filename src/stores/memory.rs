//! In-process vector store backend.
//!
//! A deterministic stand-in for the HTTP engine, used by integration tests
//! and offline runs. Cosine distance, stable tie order (insertion order), and
//! failure-injection toggles so the eraser's fallback ladder can be exercised
//! without a real server.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use async_trait::async_trait;

use super::{CollectionSchema, NewObject, PropertyFilter, StoredObject, VectorStore};
use crate::types::{EngineError, UpstreamService};

struct Collection {
    schema: CollectionSchema,
    objects: Vec<(String, super::ChunkProperties, Vec<f32>)>,
}

/// Reference [`VectorStore`] held entirely in process memory.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
    fail_structured_fetch: AtomicBool,
    fail_legacy_fetch: AtomicBool,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes [`VectorStore::fetch_all`] raise, simulating an engine version
    /// without the structured query interface.
    pub fn fail_structured_fetch(&self, fail: bool) {
        self.fail_structured_fetch.store(fail, Ordering::SeqCst);
    }

    /// Makes [`VectorStore::fetch_all_legacy`] raise as well.
    pub fn fail_legacy_fetch(&self, fail: bool) {
        self.fail_legacy_fetch.store(fail, Ordering::SeqCst);
    }

    /// Total number of stored objects across one collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.objects.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn unavailable(detail: &str) -> EngineError {
        EngineError::UpstreamUnavailable {
            service: UpstreamService::VectorStore,
            detail: detail.to_string(),
        }
    }

    fn collect_filtered(
        collection: &Collection,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Vec<StoredObject> {
        collection
            .objects
            .iter()
            .filter(|(_, properties, _)| filter.is_none_or(|f| f.matches(properties)))
            .take(limit)
            .map(|(id, properties, _)| StoredObject {
                id: id.clone(),
                properties: properties.clone(),
            })
            .collect()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::MAX;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return f32::MAX;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), EngineError> {
        let mut collections = self.collections.write();
        if let Some(existing) = collections.get(&schema.name) {
            let mut found = existing.schema.properties.clone();
            let mut wanted = schema.properties.clone();
            found.sort_by(|a, b| a.name.cmp(&b.name));
            wanted.sort_by(|a, b| a.name.cmp(&b.name));
            if found != wanted {
                return Err(EngineError::SchemaConflict {
                    collection: schema.name.clone(),
                    detail: format!("expected properties {wanted:?}, found {found:?}"),
                });
            }
            return Ok(());
        }
        collections.insert(
            schema.name.clone(),
            Collection {
                schema: schema.clone(),
                objects: Vec::new(),
            },
        );
        Ok(())
    }

    async fn insert_batch(
        &self,
        collection: &str,
        objects: Vec<NewObject>,
    ) -> Result<Vec<String>, EngineError> {
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| Self::unavailable(&format!("collection '{collection}' not found")))?;

        let mut ids = Vec::with_capacity(objects.len());
        for object in objects {
            let id = Uuid::new_v4().to_string();
            target
                .objects
                .push((id.clone(), object.properties, object.vector));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<(), EngineError> {
        let mut collections = self.collections.write();
        if let Some(target) = collections.get_mut(collection) {
            target.objects.retain(|(object_id, _, _)| object_id != id);
        }
        Ok(())
    }

    async fn search_near_vector(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&PropertyFilter>,
    ) -> Result<Vec<StoredObject>, EngineError> {
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| Self::unavailable(&format!("collection '{collection}' not found")))?;

        let mut scored: Vec<(f32, StoredObject)> = target
            .objects
            .iter()
            .filter(|(_, properties, _)| filter.is_none_or(|f| f.matches(properties)))
            .map(|(id, properties, stored_vector)| {
                (
                    cosine_distance(vector, stored_vector),
                    StoredObject {
                        id: id.clone(),
                        properties: properties.clone(),
                    },
                )
            })
            .collect();
        // Stable sort keeps insertion order on distance ties.
        scored.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, object)| object)
            .collect())
    }

    async fn fetch_all(
        &self,
        collection: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, EngineError> {
        if self.fail_structured_fetch.load(Ordering::SeqCst) {
            return Err(Self::unavailable(
                "structured query interface not supported",
            ));
        }
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| Self::unavailable(&format!("collection '{collection}' not found")))?;
        Ok(Self::collect_filtered(target, filter, limit))
    }

    async fn fetch_all_legacy(
        &self,
        collection: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, EngineError> {
        if self.fail_legacy_fetch.load(Ordering::SeqCst) {
            return Err(Self::unavailable("legacy query interface not supported"));
        }
        let collections = self.collections.read();
        let target = collections
            .get(collection)
            .ok_or_else(|| Self::unavailable(&format!("collection '{collection}' not found")))?;
        Ok(Self::collect_filtered(target, filter, limit))
    }

    async fn ready(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::ChunkProperties;

    fn properties(source: &str, category: &str) -> ChunkProperties {
        ChunkProperties {
            text: format!("text from {source}"),
            source: source.to_string(),
            page: 1,
            policy_category: category.to_string(),
            last_updated: "2024-01-01".to_string(),
        }
    }

    fn schema() -> CollectionSchema {
        CollectionSchema::policy_chunks("PolicyChunks")
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent_but_schema_strict() {
        let store = MemoryVectorStore::new();
        store.ensure_collection(&schema()).await.unwrap();
        store.ensure_collection(&schema()).await.unwrap();

        let mut conflicting = schema();
        conflicting.properties.pop();
        let err = store.ensure_collection(&conflicting).await.unwrap_err();
        assert!(matches!(err, EngineError::SchemaConflict { .. }));
    }

    #[tokio::test]
    async fn nearest_search_ranks_by_cosine_distance() {
        let store = MemoryVectorStore::new();
        store.ensure_collection(&schema()).await.unwrap();
        store
            .insert_batch(
                "PolicyChunks",
                vec![
                    NewObject {
                        properties: properties("far.pdf", "Other"),
                        vector: vec![0.0, 1.0],
                    },
                    NewObject {
                        properties: properties("near.pdf", "Other"),
                        vector: vec![1.0, 0.05],
                    },
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search_near_vector("PolicyChunks", &[1.0, 0.0], 2, None)
            .await
            .unwrap();
        assert_eq!(hits[0].properties.source, "near.pdf");
        assert_eq!(hits[1].properties.source, "far.pdf");
    }

    #[tokio::test]
    async fn fetch_failure_toggles_mimic_interface_drift() {
        let store = MemoryVectorStore::new();
        store.ensure_collection(&schema()).await.unwrap();

        store.fail_structured_fetch(true);
        assert!(store.fetch_all("PolicyChunks", None, 10).await.is_err());
        assert!(
            store
                .fetch_all_legacy("PolicyChunks", None, 10)
                .await
                .is_ok()
        );
    }
}
