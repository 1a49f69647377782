//! Streaming provider tests against a `wiremock` mock server
//!
//! Each test mounts a canned response body and checks the text deltas (or the
//! error) that the provider turns it into.

mod common;

use std::time::Duration;

use futures::StreamExt;
use pocketchat::config::{DataStreamConfig, OllamaConfig};
use pocketchat::history::{Message, Role};
use pocketchat::providers::{DataStreamProvider, OllamaProvider, Provider};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::data_stream_body;

fn data_stream(server: &MockServer) -> DataStreamProvider {
    DataStreamProvider::new(
        DataStreamConfig {
            base_url: server.uri(),
            api_path: "/api/chat".to_string(),
        },
        Duration::from_secs(5),
    )
    .expect("data stream provider")
}

fn ollama(server: &MockServer) -> OllamaProvider {
    OllamaProvider::new(
        OllamaConfig {
            host: server.uri(),
            model: "llama3.2:latest".to_string(),
        },
        Duration::from_secs(5),
    )
    .expect("ollama provider")
}

fn conversation() -> Vec<Message> {
    vec![Message::with_id("user-1", Role::User, "Say hello")]
}

async fn collect(provider: &dyn Provider) -> Vec<Result<String, String>> {
    let stream = provider
        .stream_chat("1700000000000", &conversation())
        .await
        .expect("stream started");
    stream.map(|item| item.map_err(|e| e.to_string())).collect().await
}

#[tokio::test]
async fn test_data_stream_concatenates_text_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "id": "1700000000000",
            "messages": [{"id": "user-1", "role": "user", "content": "Say hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(data_stream_body(&[
            "Hel", "lo, ", "world\n",
        ])))
        .mount(&server)
        .await;

    let items = collect(&data_stream(&server)).await;
    let text: String = items.into_iter().map(|i| i.unwrap()).collect();
    assert_eq!(text, "Hello, world\n");
}

#[tokio::test]
async fn test_data_stream_ignores_unknown_parts() {
    let server = MockServer::start().await;
    let body = concat!(
        "f:{\"messageId\":\"m1\"}\n",
        "2:[{\"kind\":\"data\"}]\n",
        "0:\"only text\"\n",
        "8:[{\"annotation\":true}]\n",
        "d:{\"finishReason\":\"stop\"}\n",
    );
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let items = collect(&data_stream(&server)).await;
    assert_eq!(items, vec![Ok("only text".to_string())]);
}

#[tokio::test]
async fn test_data_stream_error_part_ends_stream() {
    let server = MockServer::start().await;
    let body = "0:\"partial\"\n3:\"rate limit exceeded\"\n0:\"never seen\"\n";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let items = collect(&data_stream(&server)).await;
    assert_eq!(
        items,
        vec![
            Ok("partial".to_string()),
            Err("Stream error: rate limit exceeded".to_string())
        ]
    );
}

#[tokio::test]
async fn test_data_stream_stops_at_finish_part() {
    let server = MockServer::start().await;
    let body = "0:\"done\"\nd:{\"finishReason\":\"length\"}\n0:\"after finish\"\n";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let items = collect(&data_stream(&server)).await;
    assert_eq!(items, vec![Ok("done".to_string())]);
}

#[tokio::test]
async fn test_data_stream_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let result = data_stream(&server)
        .stream_chat("1", &conversation())
        .await;
    let err = result.err().expect("request should fail");
    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("maintenance"));
}

#[tokio::test]
async fn test_ollama_streams_ndjson() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"model\":\"llama3.2:latest\",\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n",
        "{\"model\":\"llama3.2:latest\",\"message\":{\"role\":\"assistant\",\"content\":\" there\"},\"done\":false}\n",
        "{\"model\":\"llama3.2:latest\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"eval_count\":2}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.2:latest",
            "stream": true,
            "messages": [{"role": "user", "content": "Say hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let items = collect(&ollama(&server)).await;
    assert_eq!(items, vec![Ok("Hi".to_string()), Ok(" there".to_string())]);
}

#[tokio::test]
async fn test_ollama_error_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("{\"error\":\"model 'nope' not found\"}\n"),
        )
        .mount(&server)
        .await;

    let items = collect(&ollama(&server)).await;
    assert_eq!(
        items,
        vec![Err("Stream error: model 'nope' not found".to_string())]
    );
}
