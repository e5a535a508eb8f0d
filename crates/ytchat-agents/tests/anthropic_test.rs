use axum::{
    Router,
    extract::Json,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use ytchat_agents::providers::{AnthropicProvider, ChatMessage, LlmProvider};
use ytchat_common::{Error, Result, Role};

// Mock server setup
async fn start_mock_server() -> (SocketAddr, oneshot::Sender<()>) {
    let (tx, rx) = oneshot::channel::<()>();

    let app = Router::new().route("/v1/messages", post(mock_messages));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, tx)
}

// Echoes what it received so tests can assert on the translated payload.
async fn mock_messages(headers: HeaderMap, Json(payload): Json<serde_json::Value>) -> impl IntoResponse {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let version = headers
        .get("anthropic-version")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if api_key == "overloaded-key" {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"type": "error", "error": {"type": "overloaded_error"}})),
        )
            .into_response();
    }

    if api_key == "empty-key" {
        return Json(json!({"id": "msg_123", "type": "message", "role": "assistant"})).into_response();
    }

    let roles: Vec<&str> = payload["messages"]
        .as_array()
        .map(|msgs| msgs.iter().filter_map(|m| m["role"].as_str()).collect())
        .unwrap_or_default();

    let text = format!(
        "version={} model={} max_tokens={} system={} roles={}",
        version,
        payload["model"].as_str().unwrap_or_default(),
        payload["max_tokens"],
        payload["system"].as_str().unwrap_or("<none>"),
        roles.join(",")
    );

    Json(json!({
        "id": "msg_123",
        "type": "message",
        "role": "assistant",
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "model": "claude-3-sonnet-20240229",
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {
            "input_tokens": 10,
            "output_tokens": 5
        }
    }))
    .into_response()
}

#[tokio::test]
async fn test_anthropic_complete() -> Result<()> {
    let (addr, _shutdown_tx) = start_mock_server().await;
    let base_url = format!("http://{}/v1/messages", addr);

    let provider = AnthropicProvider::new("test-key".to_string()).with_base_url(base_url);

    let messages = vec![ChatMessage::new(Role::User, "Hello")];
    let response = provider.complete(&messages).await?;

    assert_eq!(
        response,
        "version=2023-06-01 model=claude-3-sonnet-20240229 max_tokens=1000 system=<none> roles=user"
    );

    Ok(())
}

#[tokio::test]
async fn test_anthropic_system_message_extracted() -> Result<()> {
    let (addr, _shutdown_tx) = start_mock_server().await;
    let base_url = format!("http://{}/v1/messages", addr);

    let provider = AnthropicProvider::new("test-key".to_string())
        .with_base_url(base_url)
        .with_model(Some("claude-3-haiku-20240307".to_string()));

    let messages = vec![
        ChatMessage::new(Role::System, "You are a helpful assistant."),
        ChatMessage::new(Role::User, "Hello"),
        ChatMessage::new(Role::Assistant, "Hi!"),
        ChatMessage::new(Role::User, "Summarize"),
    ];
    let response = provider.complete(&messages).await?;

    assert_eq!(
        response,
        "version=2023-06-01 model=claude-3-haiku-20240307 max_tokens=1000 \
         system=You are a helpful assistant. roles=user,assistant,user"
    );

    Ok(())
}

#[tokio::test]
async fn test_anthropic_http_error() {
    let (addr, _shutdown_tx) = start_mock_server().await;
    let base_url = format!("http://{}/v1/messages", addr);

    let provider = AnthropicProvider::new("overloaded-key".to_string()).with_base_url(base_url);

    let result = provider.complete(&[ChatMessage::new(Role::User, "Hello")]).await;
    match result {
        Err(Error::Http { provider, status, .. }) => {
            assert_eq!(provider, "Claude");
            assert_eq!(status, 503);
        }
        other => panic!("Expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_anthropic_missing_content_is_no_response() {
    let (addr, _shutdown_tx) = start_mock_server().await;
    let base_url = format!("http://{}/v1/messages", addr);

    let provider = AnthropicProvider::new("empty-key".to_string()).with_base_url(base_url);

    let result = provider.complete(&[ChatMessage::new(Role::User, "Hello")]).await;
    assert!(matches!(result, Err(Error::NoResponse { .. })));
}
