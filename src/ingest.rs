//! Ingestion path: chunk a document, embed every chunk, write the batch, and
//! only then publish the ids in the document index.
//!
//! The index entry is appended strictly after the full batch lands, so a
//! caller that sees ingestion succeed also sees a fully populated entry. A
//! crash mid-batch can leave orphaned chunks with no index entry; those stay
//! recoverable through the eraser's filter-based fallback, which exists for
//! exactly that reason.

use futures_util::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use tracing::info;

use crate::category::PolicyCategory;
use crate::chunking::chunk_pages;
use crate::embeddings::Embedder;
use crate::index::DocumentIndex;
use crate::stores::{CollectionSchema, NewObject, VectorStore};
use crate::types::EngineError;

/// Outcome of ingesting one document.
#[derive(Clone, Debug)]
pub struct IngestionReport {
    pub source: String,
    /// Store-assigned ids, one per ingested chunk, in page order.
    pub chunk_ids: Vec<String>,
    /// Pages skipped because their text was empty or whitespace-only.
    pub pages_skipped: usize,
}

impl IngestionReport {
    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }
}

/// Owns collection lifecycle, batched insertion, and the document index.
pub struct ChunkStore {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<DocumentIndex>,
    collection: String,
    embed_concurrency: usize,
}

impl ChunkStore {
    /// Upper bound on concurrent embedding calls per batch. Results stay in
    /// input order regardless.
    pub const DEFAULT_EMBED_CONCURRENCY: usize = 4;

    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        index: Arc<DocumentIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            collection: collection.into(),
            embed_concurrency: Self::DEFAULT_EMBED_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_embed_concurrency(mut self, concurrency: usize) -> Self {
        self.embed_concurrency = concurrency.max(1);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Idempotent get-or-create of the backing collection.
    pub async fn ensure_collection(&self) -> Result<(), EngineError> {
        let schema = CollectionSchema::policy_chunks(&self.collection);
        self.store.ensure_collection(&schema).await
    }

    /// Ingests one document's per-page text under `source`.
    ///
    /// Re-ingesting an already-known source appends a second, independent
    /// chunk set to the same index entry; nothing is deduplicated.
    pub async fn ingest(
        &self,
        source: &str,
        pages: &[String],
        category: PolicyCategory,
        last_updated: &str,
    ) -> Result<IngestionReport, EngineError> {
        let chunks = chunk_pages(source, pages, category, last_updated)?;
        let pages_skipped = pages.len() - chunks.len();

        let embedder = &self.embedder;
        let objects: Vec<NewObject> = stream::iter(chunks.into_iter().map(|chunk| {
            let embedder = Arc::clone(embedder);
            async move {
                let vector = embedder.embed(&chunk.text).await?;
                Ok::<_, EngineError>(NewObject {
                    properties: chunk.into(),
                    vector,
                })
            }
        }))
        .buffered(self.embed_concurrency)
        .try_collect()
        .await?;

        let chunk_ids = self.store.insert_batch(&self.collection, objects).await?;
        self.index.append(source, &chunk_ids);

        info!(
            source,
            chunks = chunk_ids.len(),
            skipped = pages_skipped,
            "ingested document"
        );
        Ok(IngestionReport {
            source: source.to_string(),
            chunk_ids,
            pages_skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::stores::MemoryVectorStore;

    fn chunk_store(store: Arc<MemoryVectorStore>) -> ChunkStore {
        ChunkStore::new(
            store,
            Arc::new(MockEmbedder::new()),
            Arc::new(DocumentIndex::new()),
            "PolicyChunks",
        )
    }

    #[tokio::test]
    async fn index_entry_matches_returned_ids() {
        let store = Arc::new(MemoryVectorStore::new());
        let chunk_store = chunk_store(Arc::clone(&store));
        chunk_store.ensure_collection().await.unwrap();

        let pages = vec!["page one".to_string(), String::new(), "page three".to_string()];
        let report = chunk_store
            .ingest("handbook.pdf", &pages, PolicyCategory::Onboarding, "2024-05-01")
            .await
            .unwrap();

        assert_eq!(report.chunk_count(), 2);
        assert_eq!(report.pages_skipped, 1);
        assert_eq!(
            chunk_store.index.ids_for("handbook.pdf"),
            Some(report.chunk_ids.clone())
        );
        assert_eq!(store.len("PolicyChunks"), 2);
    }

    #[tokio::test]
    async fn empty_document_writes_nothing() {
        let store = Arc::new(MemoryVectorStore::new());
        let chunk_store = chunk_store(Arc::clone(&store));
        chunk_store.ensure_collection().await.unwrap();

        let err = chunk_store
            .ingest("blank.pdf", &[" ".to_string()], PolicyCategory::General, "")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::EmptyDocument { .. }));
        assert!(store.is_empty("PolicyChunks"));
        assert!(!chunk_store.index.contains("blank.pdf"));
    }
}
