//! Deletion of every chunk belonging to a named document.
//!
//! Three resolution paths, first success wins, never combined:
//!
//! 1. the process-local document index (fast path while the process lives),
//! 2. a structured-filter fetch of ids by `source`, then per-id deletes,
//! 3. the legacy query language's equivalent fetch, attempted only when the
//!    structured path itself raises (zero results is a terminal `0`).
//!
//! The store's access API has drifted across versions in practice; keeping
//! both fetch generations alive means a document can always be fully purged,
//! which matters more here than a single clean code path.

use std::sync::Arc;
use tracing::{info, warn};

use crate::index::DocumentIndex;
use crate::stores::{PropertyFilter, VectorStore};
use crate::types::EngineError;

#[derive(Clone, Copy, Debug)]
enum FetchStrategy {
    Structured,
    Legacy,
}

impl FetchStrategy {
    const FALLBACK_ORDER: [FetchStrategy; 2] = [FetchStrategy::Structured, FetchStrategy::Legacy];

    fn name(&self) -> &'static str {
        match self {
            FetchStrategy::Structured => "structured fetch",
            FetchStrategy::Legacy => "legacy fetch",
        }
    }
}

/// Removes documents chunk-by-chunk, tolerating interface drift in the store.
pub struct DocumentEraser {
    store: Arc<dyn VectorStore>,
    index: Arc<DocumentIndex>,
    collection: String,
}

impl DocumentEraser {
    /// Upper bound on ids fetched per fallback query.
    const FETCH_LIMIT: usize = 10_000;

    pub fn new(
        store: Arc<dyn VectorStore>,
        index: Arc<DocumentIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            index,
            collection: collection.into(),
        }
    }

    /// Deletes every chunk of `source` and returns the number of deletions
    /// attempted. Removing an unknown document is not an error; it deletes
    /// zero chunks.
    pub async fn remove_document(&self, source: &str) -> Result<usize, EngineError> {
        if let Some(ids) = self.index.take(source) {
            let attempted = ids.len();
            self.delete_ids(&ids).await;
            info!(source, deleted = attempted, "removed document via index");
            return Ok(attempted);
        }

        let mut attempts = Vec::new();
        for strategy in FetchStrategy::FALLBACK_ORDER {
            match self.fetch_ids(strategy, source).await {
                Ok(ids) => {
                    let fetched = ids.len();
                    self.delete_ids(&ids).await;
                    info!(
                        source,
                        deleted = fetched,
                        strategy = strategy.name(),
                        "removed document via fallback"
                    );
                    return Ok(fetched);
                }
                Err(err) => attempts.push(format!("{}: {err}", strategy.name())),
            }
        }

        Err(EngineError::DeletionFailed {
            source: source.to_string(),
            attempts,
        })
    }

    /// Fetches the ids of every chunk whose `source` matches, through one
    /// interface generation. Uniform result shape across strategies.
    async fn fetch_ids(
        &self,
        strategy: FetchStrategy,
        source: &str,
    ) -> Result<Vec<String>, EngineError> {
        let filter = PropertyFilter::SourceEquals(source.to_string());
        let objects = match strategy {
            FetchStrategy::Structured => {
                self.store
                    .fetch_all(&self.collection, Some(&filter), Self::FETCH_LIMIT)
                    .await?
            }
            FetchStrategy::Legacy => {
                self.store
                    .fetch_all_legacy(&self.collection, Some(&filter), Self::FETCH_LIMIT)
                    .await?
            }
        };
        Ok(objects.into_iter().map(|object| object.id).collect())
    }

    /// Best-effort per-id deletion; a failed single delete is logged and does
    /// not abort the batch.
    async fn delete_ids(&self, ids: &[String]) {
        for id in ids {
            if let Err(err) = self.store.delete_by_id(&self.collection, id).await {
                warn!(id = %id, error = %err, "failed to delete chunk");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{ChunkProperties, CollectionSchema, MemoryVectorStore, NewObject};

    async fn seeded_store(sources: &[&str]) -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .ensure_collection(&CollectionSchema::policy_chunks("PolicyChunks"))
            .await
            .unwrap();
        let objects = sources
            .iter()
            .map(|source| NewObject {
                properties: ChunkProperties {
                    text: "body".into(),
                    source: source.to_string(),
                    page: 1,
                    policy_category: "General".into(),
                    last_updated: String::new(),
                },
                vector: vec![1.0, 0.0],
            })
            .collect();
        store.insert_batch("PolicyChunks", objects).await.unwrap();
        store
    }

    #[tokio::test]
    async fn fallback_deletes_only_the_named_source() {
        let store = seeded_store(&["a.pdf", "a.pdf", "b.pdf"]).await;
        let eraser = DocumentEraser::new(
            Arc::clone(&store) as Arc<dyn VectorStore>,
            Arc::new(DocumentIndex::new()),
            "PolicyChunks",
        );

        let deleted = eraser.remove_document("a.pdf").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.len("PolicyChunks"), 1);
    }

    #[tokio::test]
    async fn exhausted_paths_aggregate_errors() {
        let store = seeded_store(&["a.pdf"]).await;
        store.fail_structured_fetch(true);
        store.fail_legacy_fetch(true);
        let eraser = DocumentEraser::new(
            Arc::clone(&store) as Arc<dyn VectorStore>,
            Arc::new(DocumentIndex::new()),
            "PolicyChunks",
        );

        let err = eraser.remove_document("a.pdf").await.unwrap_err();
        match err {
            EngineError::DeletionFailed { attempts, .. } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("structured fetch"));
                assert!(attempts[1].starts_with("legacy fetch"));
            }
            other => panic!("expected DeletionFailed, got {other:?}"),
        }
    }
}
