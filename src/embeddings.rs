//! Embedding gateway: a thin typed seam over the external embedding service.
//!
//! The engine calls [`Embedder::embed`] once per chunk at ingestion and once
//! per query at retrieval. The embedding model's output dimensionality is
//! pinned per collection for the collection's lifetime; mixing models
//! invalidates distance comparisons, and nothing here checks for it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::types::{EngineError, UpstreamService};

/// Converts text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError>;

    /// Name of the model producing the vectors.
    fn model(&self) -> &str;

    /// Probes whether the embedding service is reachable.
    async fn ready(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

/// Embedding provider backed by an Ollama-compatible HTTP endpoint.
#[derive(Clone, Debug)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: Url,
    model: String,
}

impl OllamaEmbedder {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: Url, model: impl Into<String>) -> Result<Self, EngineError> {
        Self::with_timeout(base_url, model, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: Url,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|err| EngineError::Config(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            model: model.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, EngineError> {
        self.base_url
            .join(path)
            .map_err(|err| EngineError::Config(err.to_string()))
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let request = EmbeddingsRequest {
            model: &self.model,
            prompt: text,
        };
        let response = self
            .client
            .post(self.endpoint("/api/embeddings")?)
            .json(&request)
            .send()
            .await
            .map_err(|err| EngineError::from_transport(UpstreamService::Embeddings, err))?
            .error_for_status()
            .map_err(|err| EngineError::from_transport(UpstreamService::Embeddings, err))?;

        let body: EmbeddingsResponse = response.json().await.map_err(|err| {
            EngineError::ResponseShape {
                service: UpstreamService::Embeddings,
                detail: err.to_string(),
            }
        })?;
        if body.embedding.is_empty() {
            return Err(EngineError::ResponseShape {
                service: UpstreamService::Embeddings,
                detail: "embedding array was empty".into(),
            });
        }
        Ok(body.embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn ready(&self) -> Result<(), EngineError> {
        self.client
            .get(self.endpoint("/")?)
            .send()
            .await
            .map_err(|err| EngineError::from_transport(UpstreamService::Embeddings, err))?
            .error_for_status()
            .map_err(|err| EngineError::from_transport(UpstreamService::Embeddings, err))?;
        Ok(())
    }
}

/// Deterministic embedder for tests and offline runs.
///
/// The vector is a byte-fold over the input, so identical text always embeds
/// identically and distinct text almost always differs.
#[derive(Clone, Debug)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let mut vector = vec![0.0f32; self.dimensions];
        for (idx, byte) in text.bytes().enumerate() {
            let slot = idx % self.dimensions;
            vector[slot] += f32::from(byte) * ((idx % 13) as f32 + 1.0);
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        "mock-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let embedder = MockEmbedder::new();
        let first = embedder.embed("remote work policy").await.unwrap();
        let second = embedder.embed("remote work policy").await.unwrap();
        let other = embedder.embed("termination policy").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first.len(), 8);
    }
}
