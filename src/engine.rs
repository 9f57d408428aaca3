//! The assembled engine: ingestion, routed answering, document inventory,
//! erasure, and readiness probes behind one facade.

use std::collections::HashMap;
use std::sync::Arc;

use crate::category::{CategoryFilter, PolicyCategory};
use crate::config::EngineConfig;
use crate::embeddings::{Embedder, OllamaEmbedder};
use crate::erasure::DocumentEraser;
use crate::generation::{Generator, OllamaGenerator};
use crate::index::DocumentIndex;
use crate::ingest::{ChunkStore, IngestionReport};
use crate::retrieval::Retriever;
use crate::routing::{
    GeneralResponder, GroundedResponder, LlmClassifier, RouteClassifier, RoutedAnswer, Router,
};
use crate::session::Session;
use crate::stores::{VectorStore, WeaviateStore};
use crate::types::EngineError;

/// Per-document rollup for inventory listings.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSummary {
    pub source: String,
    pub category: PolicyCategory,
    pub last_updated: String,
    pub chunk_count: usize,
}

/// Reachability of one upstream service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    Ready,
    Unavailable(String),
}

impl ServiceStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceStatus::Ready)
    }
}

/// Per-service readiness, reported separately so failures stay attributable.
#[derive(Clone, Debug)]
pub struct ReadinessReport {
    pub vector_store: ServiceStatus,
    pub embeddings: ServiceStatus,
}

impl ReadinessReport {
    pub fn all_ready(&self) -> bool {
        self.vector_store.is_ready() && self.embeddings.is_ready()
    }
}

/// Facade over the chunk lifecycle and the query path.
pub struct PolicyEngine {
    chunk_store: ChunkStore,
    eraser: DocumentEraser,
    router: Router,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    collection: String,
}

impl PolicyEngine {
    /// Cap on objects pulled per inventory fetch.
    const INVENTORY_LIMIT: usize = 1000;

    pub fn builder() -> PolicyEngineBuilder {
        PolicyEngineBuilder::default()
    }

    /// Wires the engine against live HTTP services described by `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let store = Arc::new(WeaviateStore::with_timeout(
            config.store_url.clone(),
            config.store_timeout,
        )?);
        let embedder = Arc::new(OllamaEmbedder::with_timeout(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
            config.model_timeout,
        )?);
        let generator = Arc::new(OllamaGenerator::with_timeout(
            config.ollama_url.clone(),
            config.generation_model.clone(),
            config.model_timeout,
        )?);
        Self::builder()
            .store(store)
            .embedder(embedder)
            .generator(generator)
            .collection(&config.collection)
            .retrieval_limit(config.retrieval_limit)
            .build()
    }

    /// Idempotently creates the backing collection.
    pub async fn ensure_collection(&self) -> Result<(), EngineError> {
        self.chunk_store.ensure_collection().await
    }

    /// Ingests one document supplied as per-page extracted text.
    pub async fn ingest_document(
        &self,
        source: &str,
        pages: &[String],
        category: PolicyCategory,
        last_updated: &str,
    ) -> Result<IngestionReport, EngineError> {
        self.chunk_store
            .ingest(source, pages, category, last_updated)
            .await
    }

    /// Routes a query and answers it within the session's conversation state.
    pub async fn answer(
        &self,
        session: &mut Session,
        query: &str,
    ) -> Result<RoutedAnswer, EngineError> {
        self.router.route(session, query).await
    }

    /// Like [`answer`](Self::answer), constraining grounded retrieval to a
    /// category.
    pub async fn answer_in_category(
        &self,
        session: &mut Session,
        query: &str,
        filter: CategoryFilter,
    ) -> Result<RoutedAnswer, EngineError> {
        self.router.route_in_category(session, query, filter).await
    }

    /// Deletes every chunk of the named document. Returns the number of
    /// deletions attempted; removing an unknown document returns 0.
    pub async fn remove_document(&self, source: &str) -> Result<usize, EngineError> {
        self.eraser.remove_document(source).await
    }

    /// Per-document inventory, most recently updated first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, EngineError> {
        let objects = self
            .store
            .fetch_all(&self.collection, None, Self::INVENTORY_LIMIT)
            .await?;

        let mut by_source: HashMap<String, DocumentSummary> = HashMap::new();
        for object in objects {
            let entry = by_source
                .entry(object.properties.source.clone())
                .or_insert_with(|| DocumentSummary {
                    source: object.properties.source.clone(),
                    category: PolicyCategory::from_stored(&object.properties.policy_category),
                    last_updated: object.properties.last_updated.clone(),
                    chunk_count: 0,
                });
            entry.chunk_count += 1;
        }

        let mut summaries: Vec<DocumentSummary> = by_source.into_values().collect();
        summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(summaries)
    }

    /// Inventory entries whose name contains `term`, case-insensitively.
    pub async fn find_documents(&self, term: &str) -> Result<Vec<DocumentSummary>, EngineError> {
        let needle = term.to_lowercase();
        Ok(self
            .list_documents()
            .await?
            .into_iter()
            .filter(|summary| summary.source.to_lowercase().contains(&needle))
            .collect())
    }

    /// Number of chunks currently in the collection (capped at the inventory
    /// fetch limit).
    pub async fn chunk_count(&self) -> Result<usize, EngineError> {
        Ok(self
            .store
            .fetch_all(&self.collection, None, Self::INVENTORY_LIMIT)
            .await?
            .len())
    }

    /// Probes the vector store and the embedding service.
    pub async fn check_readiness(&self) -> ReadinessReport {
        let vector_store = match self.store.ready().await {
            Ok(()) => ServiceStatus::Ready,
            Err(err) => ServiceStatus::Unavailable(err.to_string()),
        };
        let embeddings = match self.embedder.ready().await {
            Ok(()) => ServiceStatus::Ready,
            Err(err) => ServiceStatus::Unavailable(err.to_string()),
        };
        ReadinessReport {
            vector_store,
            embeddings,
        }
    }
}

/// Assembles a [`PolicyEngine`] from its collaborators.
#[derive(Default)]
pub struct PolicyEngineBuilder {
    store: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn Embedder>>,
    generator: Option<Arc<dyn Generator>>,
    classifier: Option<Arc<dyn RouteClassifier>>,
    collection: Option<String>,
    retrieval_limit: Option<usize>,
    embed_concurrency: Option<usize>,
}

impl PolicyEngineBuilder {
    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Overrides the default LLM-backed classifier.
    #[must_use]
    pub fn classifier(mut self, classifier: Arc<dyn RouteClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    #[must_use]
    pub fn collection(mut self, collection: &str) -> Self {
        self.collection = Some(collection.to_string());
        self
    }

    #[must_use]
    pub fn retrieval_limit(mut self, limit: usize) -> Self {
        self.retrieval_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn embed_concurrency(mut self, concurrency: usize) -> Self {
        self.embed_concurrency = Some(concurrency);
        self
    }

    pub fn build(self) -> Result<PolicyEngine, EngineError> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Config("a vector store is required".into()))?;
        let embedder = self
            .embedder
            .ok_or_else(|| EngineError::Config("an embedder is required".into()))?;
        let generator = self
            .generator
            .ok_or_else(|| EngineError::Config("a generator is required".into()))?;

        let collection = self
            .collection
            .unwrap_or_else(|| EngineConfig::DEFAULT_COLLECTION.to_string());
        let index = Arc::new(DocumentIndex::new());

        let mut chunk_store = ChunkStore::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            Arc::clone(&index),
            &collection,
        );
        if let Some(concurrency) = self.embed_concurrency {
            chunk_store = chunk_store.with_embed_concurrency(concurrency);
        }

        let eraser = DocumentEraser::new(Arc::clone(&store), Arc::clone(&index), &collection);

        let retriever = Retriever::new(Arc::clone(&store), Arc::clone(&embedder), &collection);
        let mut grounded = GroundedResponder::new(retriever, Arc::clone(&generator));
        if let Some(limit) = self.retrieval_limit {
            grounded = grounded.with_retrieval_limit(limit);
        }
        let general = GeneralResponder::new(Arc::clone(&generator));
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(LlmClassifier::new(Arc::clone(&generator))));
        let router = Router::new(classifier, grounded, general);

        Ok(PolicyEngine {
            chunk_store,
            eraser,
            router,
            store,
            embedder,
            collection,
        })
    }
}
