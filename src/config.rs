//! Environment-driven engine configuration.

use std::time::Duration;
use url::Url;

use crate::types::EngineError;

/// Connection and model settings, resolved from the environment with
/// deployment-matching defaults.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Base URL of the vector engine's HTTP API.
    pub store_url: Url,
    /// Base URL of the Ollama-compatible model server.
    pub ollama_url: Url,
    pub embedding_model: String,
    pub generation_model: String,
    pub collection: String,
    /// How many contexts a grounded answer retrieves.
    pub retrieval_limit: usize,
    /// Deadline for store metadata and data calls.
    pub store_timeout: Duration,
    /// Deadline for embedding and generation calls.
    pub model_timeout: Duration,
}

impl EngineConfig {
    pub const DEFAULT_COLLECTION: &'static str = "PolicyChunks";

    /// Resolves configuration from the environment (a `.env` file is honored
    /// when present). Unset variables fall back to local-deployment defaults.
    ///
    /// Recognized variables: `WEAVIATE_HOST`, `OLLAMA_BASE_URL`,
    /// `POLICYSMITH_EMBED_MODEL`, `POLICYSMITH_GENERATION_MODEL`,
    /// `POLICYSMITH_COLLECTION`.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();

        let store_host =
            std::env::var("WEAVIATE_HOST").unwrap_or_else(|_| "localhost".to_string());
        let store_url = Url::parse(&format!("http://{store_host}:8080"))
            .map_err(|err| EngineError::Config(format!("invalid WEAVIATE_HOST: {err}")))?;

        let mut ollama_base = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());
        if !ollama_base.starts_with("http") {
            ollama_base = format!("http://{ollama_base}");
        }
        let ollama_url = Url::parse(&ollama_base)
            .map_err(|err| EngineError::Config(format!("invalid OLLAMA_BASE_URL: {err}")))?;

        Ok(Self {
            store_url,
            ollama_url,
            embedding_model: std::env::var("POLICYSMITH_EMBED_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            generation_model: std::env::var("POLICYSMITH_GENERATION_MODEL")
                .unwrap_or_else(|_| "tinyllama".to_string()),
            collection: std::env::var("POLICYSMITH_COLLECTION")
                .unwrap_or_else(|_| Self::DEFAULT_COLLECTION.to_string()),
            retrieval_limit: 3,
            store_timeout: Duration::from_secs(10),
            model_timeout: Duration::from_secs(30),
        })
    }
}
