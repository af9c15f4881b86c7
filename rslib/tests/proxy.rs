use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use studydesk::ai_generation::config::{AiGenerationConfig, ApiKey};
use studydesk::ai_generation::ProviderKind;
use studydesk::proxy;
use studydesk::proxy::config::DEFAULT_ROUTE;
use studydesk::proxy::ProxyState;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn_proxy(state: ProxyState) -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let router = proxy::router(state, DEFAULT_ROUTE);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}{DEFAULT_ROUTE}")
}

fn config(provider: ProviderKind, upstream: &MockServer) -> AiGenerationConfig {
    config_for_base_url(provider, upstream.uri())
}

fn config_for_base_url(provider: ProviderKind, base_url: String) -> AiGenerationConfig {
    AiGenerationConfig {
        provider,
        api_key: ApiKey::new("test-key"),
        base_url: Some(base_url),
        timeout_secs: Some(1),
        ..Default::default()
    }
}

async fn configured_proxy(provider: ProviderKind, upstream: &MockServer) -> String {
    spawn_proxy(ProxyState::from_config(&config(provider, upstream)).unwrap()).await
}

fn valid_body() -> Value {
    json!({
        "system": "Be brief",
        "messages": [{"role": "user", "content": "Simplify these notes"}]
    })
}

async fn post(url: &str, body: &Value) -> (StatusCode, Value) {
    let response = Client::new().post(url).json(body).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap()
}

#[tokio::test]
async fn rejects_other_methods() {
    let url = spawn_proxy(ProxyState::unconfigured("ANTHROPIC_API_KEY")).await;

    let response = Client::new().get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(error_message(&body), "Method Not Allowed. Use POST.");
}

#[tokio::test]
async fn answers_preflight_with_cors_headers() {
    let url = spawn_proxy(ProxyState::unconfigured("ANTHROPIC_API_KEY")).await;

    let response = Client::new()
        .request(reqwest::Method::OPTIONS, &url)
        .header("origin", "https://study.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    let methods = headers["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("POST") && methods.contains("OPTIONS"));
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_credential_fails_whatever_the_body() {
    let url = spawn_proxy(ProxyState::unconfigured("ANTHROPIC_API_KEY")).await;

    for body in [valid_body(), json!({}), json!({"messages": []})] {
        let (status, reply) = post(&url, &body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error_message(&reply),
            "Server configuration error: API key missing."
        );
    }
}

#[tokio::test]
async fn missing_messages_is_a_bad_request() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Anthropic, &upstream).await;

    for body in [json!({}), json!({"messages": []}), json!({"messages": "hi"})] {
        let (status, reply) = post(&url, &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error_message(&reply).is_empty());
    }
}

#[tokio::test]
async fn relays_anthropic_reply_as_text() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "TOPIC: Cells"}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Anthropic, &upstream).await;

    let (status, reply) = post(&url, &valid_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({"text": "TOPIC: Cells"}));
}

#[tokio::test]
async fn relays_groq_reply_as_text() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "[]"}}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Groq, &upstream).await;

    let (status, reply) = post(&url, &valid_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["text"], "[]");
}

#[tokio::test]
async fn passes_provider_rejection_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"type": "rate_limit_error", "message": "Too many requests"}
        })))
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Anthropic, &upstream).await;

    let (status, reply) = post(&url, &valid_body()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_message(&reply), "Too many requests");
}

#[tokio::test]
async fn blank_provider_reply_is_bad_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Anthropic, &upstream).await;

    let (status, reply) = post(&url, &valid_body()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_message(&reply), "Empty response from Anthropic.");
}

#[tokio::test]
async fn slow_provider_is_gateway_timeout() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"content": [{"type": "text", "text": "late"}]}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Anthropic, &upstream).await;

    let (status, reply) = post(&url, &valid_body()).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(!error_message(&reply).is_empty());
}

#[tokio::test]
async fn response_never_carries_the_credential() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Groq, &upstream).await;

    let response = Client::new().post(&url).json(&valid_body()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let text = response.text().await.unwrap();
    assert!(!text.contains("test-key"));
    assert!(text.contains("Upstream API error."));
}

#[tokio::test]
async fn undecodable_provider_reply_is_bad_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Anthropic, &upstream).await;

    let (status, reply) = post(&url, &valid_body()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&reply).contains("not valid JSON"));
}

#[tokio::test]
async fn unreachable_provider_is_bad_gateway() {
    // nothing listens on the discard port
    let config = config_for_base_url(ProviderKind::Groq, "http://127.0.0.1:9".into());
    let url = spawn_proxy(ProxyState::from_config(&config).unwrap()).await;

    let (status, reply) = post(&url, &valid_body()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&reply).starts_with("Failed to reach the AI provider"));
}

#[tokio::test]
async fn configured_token_limit_applies_when_request_has_none() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"max_tokens": 256})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "ok"}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let config = AiGenerationConfig {
        max_tokens: Some(256),
        ..config(ProviderKind::Anthropic, &upstream)
    };
    let url = spawn_proxy(ProxyState::from_config(&config).unwrap()).await;

    let (status, _) = post(&url, &valid_body()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn content_parts_are_forwarded_verbatim() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": [{"type": "text", "text": "Simplify"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "ok"}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let url = configured_proxy(ProviderKind::Anthropic, &upstream).await;

    let body = json!({
        "messages": [{"role": "user", "content": [{"type": "text", "text": "Simplify"}]}]
    });
    let (status, reply) = post(&url, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["text"], "ok");
}
