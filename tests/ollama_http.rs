//! HTTP-boundary tests for the Ollama-backed embedding and generation
//! providers.

use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use url::Url;

use policysmith::{Embedder, EngineError, Generator, OllamaEmbedder, OllamaGenerator};

#[tokio::test]
async fn embedder_posts_model_and_prompt() {
    let server = MockServer::start_async().await;
    let embeddings = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/embeddings")
                .body_contains("nomic-embed-text")
                .body_contains("what is the leave policy?");
            then.status(200)
                .json_body(json!({ "embedding": [0.25, -0.5, 0.125] }));
        })
        .await;

    let embedder = OllamaEmbedder::new(
        Url::parse(&server.base_url()).unwrap(),
        "nomic-embed-text",
    )
    .unwrap();
    let vector = embedder.embed("what is the leave policy?").await.unwrap();

    assert_eq!(vector, vec![0.25, -0.5, 0.125]);
    embeddings.assert_async().await;
}

#[tokio::test]
async fn empty_embedding_is_a_shape_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(200).json_body(json!({ "embedding": [] }));
        })
        .await;

    let embedder =
        OllamaEmbedder::new(Url::parse(&server.base_url()).unwrap(), "nomic-embed-text").unwrap();
    let err = embedder.embed("anything").await.unwrap_err();
    assert!(matches!(err, EngineError::ResponseShape { .. }));
}

#[tokio::test]
async fn embedder_maps_server_failure_to_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(503);
        })
        .await;

    let embedder =
        OllamaEmbedder::new(Url::parse(&server.base_url()).unwrap(), "nomic-embed-text").unwrap();
    let err = embedder.embed("anything").await.unwrap_err();
    assert!(matches!(err, EngineError::UpstreamUnavailable { .. }));
}

#[tokio::test]
async fn slow_embedding_call_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({ "embedding": [0.1] }));
        })
        .await;

    let embedder = OllamaEmbedder::with_timeout(
        Url::parse(&server.base_url()).unwrap(),
        "nomic-embed-text",
        Duration::from_millis(100),
    )
    .unwrap();
    let err = embedder.embed("anything").await.unwrap_err();
    assert!(matches!(err, EngineError::UpstreamTimeout { .. }));
}

#[tokio::test]
async fn generator_requests_non_streaming_completion() {
    let server = MockServer::start_async().await;
    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("\"stream\":false")
                .body_contains("tinyllama");
            then.status(200)
                .json_body(json!({ "response": "thirty days of annual leave" }));
        })
        .await;

    let generator =
        OllamaGenerator::new(Url::parse(&server.base_url()).unwrap(), "tinyllama").unwrap();
    let text = generator.generate("summarize the leave policy").await.unwrap();

    assert_eq!(text, "thirty days of annual leave");
    generate.assert_async().await;
}

#[tokio::test]
async fn generator_maps_server_failure_to_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(500);
        })
        .await;

    let generator =
        OllamaGenerator::new(Url::parse(&server.base_url()).unwrap(), "tinyllama").unwrap();
    let err = generator.generate("anything").await.unwrap_err();
    assert!(matches!(err, EngineError::UpstreamUnavailable { .. }));
}
