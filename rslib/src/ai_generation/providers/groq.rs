use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai_generation::config::ApiKey;
use crate::ai_generation::{
    AiResult, ChatMessage, ChatResponse, CompletionRequest, ProviderKind, DEFAULT_MAX_TOKENS,
};

use super::{decode_reply, send_json, AiProvider, ProviderReply};

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const TEMPERATURE: f32 = 0.7;

pub struct GroqProvider {
    client: Client,
    api_key: ApiKey,
    model: String,
    endpoint: String,
    max_tokens: u32,
}

impl GroqProvider {
    pub fn new(
        client: Client,
        api_key: ApiKey,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: format!("{}{COMPLETIONS_PATH}", base_url.trim_end_matches('/')),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Limit used when a request does not carry its own.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(crate) fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: with_system_message(request.system_prompt(), &request.messages),
            max_tokens: request.max_tokens_or(self.max_tokens),
            temperature: TEMPERATURE,
        }
    }
}

/// This API has no separate system field, so the system prompt travels as a
/// leading message, and only when there is one.
pub(crate) fn with_system_message(system: Option<&str>, messages: &[ChatMessage]) -> Vec<ChatMessage> {
    system
        .map(ChatMessage::system)
        .into_iter()
        .chain(messages.iter().cloned())
        .collect()
}

#[async_trait::async_trait]
impl AiProvider for GroqProvider {
    async fn complete(&self, request: &CompletionRequest) -> AiResult<ChatResponse> {
        let body = self.build_request(request);
        let http = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose());

        let bytes = send_json(ProviderKind::Groq, http, &body).await?;
        let reply: ChatCompletionResponse = decode_reply(ProviderKind::Groq, &bytes)?;
        ProviderReply::Choices(reply).into_response()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    pub(crate) fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .find_map(|choice| choice.message.and_then(|message| message.content))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ai_generation::providers::http_client;
    use crate::ai_generation::Role;
    use crate::error::StudyError;

    fn provider(base_url: Option<String>) -> GroqProvider {
        GroqProvider::new(
            http_client(std::time::Duration::from_secs(5)).unwrap(),
            ApiKey::new("gsk_test").unwrap(),
            None,
            base_url,
        )
    }

    fn request(system: Option<&str>) -> CompletionRequest {
        CompletionRequest {
            system: system.map(ToString::to_string),
            messages: vec![ChatMessage::user("Create 8 flashcards")],
            max_tokens: Some(512),
        }
    }

    #[test]
    fn splices_system_message_only_when_present() {
        let provider = provider(None);

        let with_system = provider.build_request(&request(Some("Reply in JSON")));
        assert_eq!(with_system.messages.len(), 2);
        assert_eq!(with_system.messages[0], ChatMessage::system("Reply in JSON"));
        assert_eq!(with_system.messages[1].role, Role::User);

        for system in [None, Some(""), Some("  \n")] {
            let body = provider.build_request(&request(system));
            assert_eq!(body.messages, vec![ChatMessage::user("Create 8 flashcards")]);
        }
    }

    #[tokio::test]
    async fn normalizes_choice_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer gsk_test"))
            .and(body_json(json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [
                    {"role": "system", "content": "Reply in JSON"},
                    {"role": "user", "content": "Create 8 flashcards"}
                ],
                "max_tokens": 512,
                "temperature": 0.7
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "[{\"q\":\"Q\",\"a\":\"A\"}]"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(Some(server.uri()))
            .complete(&request(Some("Reply in JSON")))
            .await
            .unwrap();
        assert_eq!(response.text, r#"[{"q":"Q","a":"A"}]"#);
    }

    #[tokio::test]
    async fn unparseable_error_body_gets_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
            .mount(&server)
            .await;

        let err = provider(Some(server.uri()))
            .complete(&request(None))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 503);
        assert_eq!(err.caller_message(), "Upstream API error.");
    }

    #[tokio::test]
    async fn missing_choices_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(Some(server.uri()))
            .complete(&request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::EmptyResponse { .. }));
    }
}
