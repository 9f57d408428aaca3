//! ```text
//! Document intake ──► chunking ──► embeddings ──► stores (insert batch)
//!                                                   │
//!                                                   └─► index (source → ids)
//!
//! Query ──► routing ─┬─► retrieval ──► embeddings ──► stores (nearVector)
//!                    │        │
//!                    │        └─► grounded answer (generation)
//!                    └─► general answer (generation, history only)
//!
//! Document name ──► erasure ──► index ids │ structured fetch │ legacy fetch
//! ```
//!
//! policysmith is the document-chunk lifecycle and retrieval engine behind a
//! policy-document assistant. Documents arrive as per-page extracted text,
//! become tracked chunks in an external vector engine, get retrieved under
//! optional category filters, and can always be fully purged by name, even
//! after the process-local id index is gone.

pub mod category;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod erasure;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod retrieval;
pub mod routing;
pub mod session;
pub mod stores;
pub mod types;

pub use category::{CategoryFilter, PolicyCategory};
pub use chunking::{PolicyChunk, chunk_pages};
pub use config::EngineConfig;
pub use embeddings::{Embedder, MockEmbedder, OllamaEmbedder};
pub use engine::{DocumentSummary, PolicyEngine, ReadinessReport, ServiceStatus};
pub use erasure::DocumentEraser;
pub use generation::{Generator, MockGenerator, OllamaGenerator};
pub use index::DocumentIndex;
pub use ingest::{ChunkStore, IngestionReport};
pub use retrieval::{RetrievedContext, Retriever};
pub use routing::{
    NO_CONTEXT_MESSAGE, Route, RouteClassifier, RoutedAnswer, Router,
};
pub use session::{BoundedHistory, Session, SourceRef};
pub use stores::{MemoryVectorStore, VectorStore, WeaviateStore};
pub use types::{EngineError, UpstreamService};
