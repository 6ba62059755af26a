//! # OpenAI Provider Tests
//!
//! Exercises `OpenAiProvider` against an `httpmock` server: the request shape, the
//! mapping of HTTP failures onto `PromptError` variants and the single retry on
//! timeouts.

mod common;

use common::setup_tracing;
use hslookup::providers::ai::openai::{OpenAiProvider, OpenAiSettings};
use hslookup::providers::ai::AiProvider;
use hslookup::{Conversation, PromptError};
use httpmock::{Method::POST, MockServer};
use serde_json::json;
use std::time::Duration;

fn provider_for(server: &MockServer) -> OpenAiProvider {
    let settings = OpenAiSettings::new(server.url("/v1/chat/completions"), "test-key", "gpt-4o");
    OpenAiProvider::new(settings).unwrap()
}

fn history() -> Conversation {
    let mut conversation = Conversation::new();
    conversation.append_user("How many products are there?");
    conversation
}

#[tokio::test]
async fn test_request_shape_and_trimmed_reply() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .json_body(json!({
                    "model": "gpt-4o",
                    "messages": [
                        {"role": "system", "content": "SYSTEM"},
                        {"role": "user", "content": "How many products are there?"}
                    ],
                    "max_tokens": 3000
                }));
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "  data.shape[0]\n"}}]
            }));
        })
        .await;

    let provider = provider_for(&server);
    let reply = provider.complete("SYSTEM", history().turns()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "data.shape[0]");
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("invalid api key");
        })
        .await;

    let result = provider_for(&server).complete("SYSTEM", history().turns()).await;
    assert!(matches!(result, Err(PromptError::AiAuth(401))));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).body("boom");
        })
        .await;

    let result = provider_for(&server).complete("SYSTEM", history().turns()).await;
    match result {
        Err(PromptError::AiApi { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected AiApi, got {other:?}"),
    }
    assert_eq!(mock.hits_async().await, 1);
}

#[tokio::test]
async fn test_malformed_and_empty_bodies() {
    let server = MockServer::start_async().await;
    let mut malformed = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body("not json");
        })
        .await;

    let provider = provider_for(&server);
    let result = provider.complete("SYSTEM", history().turns()).await;
    assert!(matches!(result, Err(PromptError::AiDeserialization(_))));
    malformed.delete_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        })
        .await;
    let result = provider.complete("SYSTEM", history().turns()).await;
    assert!(matches!(result, Err(PromptError::EmptyCompletion)));
}

#[tokio::test]
async fn test_timeout_is_retried_once() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({"choices": [{"message": {"content": "late"}}]}));
        })
        .await;

    let mut settings =
        OpenAiSettings::new(server.url("/v1/chat/completions"), "test-key", "gpt-4o");
    settings.timeout = Duration::from_millis(200);
    settings.max_retries = 5;
    let provider = OpenAiProvider::new(settings).unwrap();

    let result = provider.complete("SYSTEM", history().turns()).await;
    assert!(matches!(result, Err(PromptError::AiRequest(_))));
    assert_eq!(mock.hits_async().await, 2);
}

#[test]
fn test_blank_api_key_is_rejected() {
    let settings = OpenAiSettings::new("http://localhost/v1/chat/completions", "  ", "gpt-4o");
    assert!(matches!(
        OpenAiProvider::new(settings),
        Err(PromptError::MissingApiKey)
    ));
}
