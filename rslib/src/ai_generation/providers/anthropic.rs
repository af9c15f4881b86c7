use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai_generation::config::ApiKey;
use crate::ai_generation::{
    AiResult, ChatMessage, ChatResponse, CompletionRequest, ProviderKind, DEFAULT_MAX_TOKENS,
};

use super::{decode_reply, send_json, AiProvider, ProviderReply};

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: ApiKey,
    model: String,
    endpoint: String,
    max_tokens: u32,
}

impl AnthropicProvider {
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
            endpoint: format!("{}{MESSAGES_PATH}", base_url.trim_end_matches('/')),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// The system prompt is a top-level field here, so messages pass through
    /// untouched.
    /// Limit used when a request does not carry its own.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(crate) fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens_or(self.max_tokens),
            messages: &request.messages,
            system: request.system_prompt(),
        }
    }
}

#[async_trait::async_trait]
impl AiProvider for AnthropicProvider {
    async fn complete(&self, request: &CompletionRequest) -> AiResult<ChatResponse> {
        let body = self.build_request(request);
        let http = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION);

        let bytes = send_json(ProviderKind::Anthropic, http, &body).await?;
        let reply: MessagesResponse = decode_reply(ProviderKind::Anthropic, &bytes)?;
        ProviderReply::ContentBlocks(reply).into_response()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    pub(crate) fn into_text(self) -> Option<String> {
        let text: String = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        (!text.is_empty()).then_some(text)
    }
}
