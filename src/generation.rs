//! Generation boundary: synchronous, non-streaming text generation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use crate::types::{EngineError, UpstreamService};

/// Produces a completion for a fully assembled prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError>;

    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generator backed by an Ollama-compatible HTTP endpoint.
#[derive(Clone, Debug)]
pub struct OllamaGenerator {
    client: Client,
    base_url: Url,
    model: String,
}

impl OllamaGenerator {
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
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        let endpoint = self
            .base_url
            .join("/api/generate")
            .map_err(|err| EngineError::Config(err.to_string()))?;
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| EngineError::from_transport(UpstreamService::Generation, err))?
            .error_for_status()
            .map_err(|err| EngineError::from_transport(UpstreamService::Generation, err))?;

        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|err| EngineError::ResponseShape {
                    service: UpstreamService::Generation,
                    detail: err.to_string(),
                })?;
        Ok(body.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Scripted generator for tests. Counts calls so tests can assert the
/// generation service was, or was not, invoked.
#[derive(Clone, Debug)]
pub struct MockGenerator {
    reply: String,
    calls: Arc<AtomicUsize>,
}

impl MockGenerator {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `generate` calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "mock-generator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_generator_counts_calls() {
        let generator = MockGenerator::with_reply("fine");
        assert_eq!(generator.calls(), 0);
        generator.generate("q1").await.unwrap();
        generator.generate("q2").await.unwrap();
        assert_eq!(generator.calls(), 2);
    }
}
