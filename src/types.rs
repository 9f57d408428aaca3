//! Crate-wide error taxonomy.
//!
//! Every failure a caller can observe maps to one [`EngineError`] variant with
//! a human-readable message specific enough to distinguish "nothing to ingest"
//! from "upstream service down" from "deletion exhausted every path". Nothing
//! in the crate retries automatically; retry policy belongs to the caller.

use thiserror::Error;

/// External collaborators the engine talks to over the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamService {
    /// The vector engine holding collections of chunks.
    VectorStore,
    /// The embedding service turning text into vectors.
    Embeddings,
    /// The text-generation service.
    Generation,
}

impl UpstreamService {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamService::VectorStore => "vector store",
            UpstreamService::Embeddings => "embedding service",
            UpstreamService::Generation => "generation service",
        }
    }
}

impl std::fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by ingestion, retrieval, erasure, and routing.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No page of the document produced any text; nothing was written to the
    /// store and no index entry was created.
    #[error("document '{source}' contained no extractable text; nothing was ingested", source = .r#source)]
    EmptyDocument { r#source: String },

    /// The collection already exists with a property layout that does not
    /// match the requested schema.
    #[error("collection '{collection}' exists with an incompatible schema: {detail}")]
    SchemaConflict { collection: String, detail: String },

    /// A call to an upstream service exceeded its deadline.
    #[error("call to the {service} timed out")]
    UpstreamTimeout { service: UpstreamService },

    /// An upstream service failed or refused the call.
    #[error("the {service} is unavailable: {detail}")]
    UpstreamUnavailable {
        service: UpstreamService,
        detail: String,
    },

    /// An upstream response arrived but did not have the shape any known
    /// adapter understands.
    #[error("unexpected response shape from the {service}: {detail}")]
    ResponseShape {
        service: UpstreamService,
        detail: String,
    },

    /// Every deletion path was attempted and every one of them raised.
    /// `attempts` carries one message per failed path.
    #[error("failed to delete document '{source}': {}", .attempts.join("; "), source = .r#source)]
    DeletionFailed {
        r#source: String,
        attempts: Vec<String>,
    },

    /// Invalid engine configuration (bad URL, unparsable value).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Maps a transport-level failure onto the timeout/unavailable split the
    /// caller needs to distinguish.
    pub(crate) fn from_transport(service: UpstreamService, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EngineError::UpstreamTimeout { service }
        } else {
            EngineError::UpstreamUnavailable {
                service,
                detail: err.to_string(),
            }
        }
    }
}
