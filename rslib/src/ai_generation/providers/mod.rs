use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai_generation::config::{AiGenerationConfig, ApiKey};
use crate::ai_generation::{AiResult, ChatResponse, CompletionRequest, ProviderKind};
use crate::error::{EmptyResponseSnafu, StudyError};

pub mod anthropic;
pub mod groq;
pub mod proxy_client;

const GENERIC_UPSTREAM_ERROR: &str = "Upstream API error.";

/// Something that can turn a completion request into normalized text: a
/// provider called directly, or the proxy in front of one.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> AiResult<ChatResponse>;
}

/// Builds the provider selected by configuration.
pub fn provider_factory(config: &AiGenerationConfig) -> AiResult<Box<dyn AiProvider>> {
    let api_key = require_api_key(config.provider, config.api_key())?;
    let client = http_client(config.timeout())?;
    let max_tokens = config.max_tokens();

    Ok(match config.provider {
        ProviderKind::Anthropic => Box::new(anthropic::AnthropicProvider::new(
            client,
            api_key,
            config.model.clone(),
            config.base_url.clone(),
        )
        .with_max_tokens(max_tokens)),
        ProviderKind::Groq => Box::new(groq::GroqProvider::new(
            client,
            api_key,
            config.model.clone(),
            config.base_url.clone(),
        )
        .with_max_tokens(max_tokens)),
    })
}

pub(crate) fn require_api_key(provider: ProviderKind, api_key: Option<&ApiKey>) -> AiResult<ApiKey> {
    match api_key {
        Some(key) => Ok(key.clone()),
        None => Err(StudyError::Configuration {
            message: format!("{} is not set", provider.credential_var()),
        }),
    }
}

pub(crate) fn http_client(timeout: Duration) -> AiResult<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// A provider reply, decoded according to the configured provider.
#[derive(Debug)]
pub enum ProviderReply {
    /// Anthropic: `{"content": [{"type": "text", "text": ...}]}`
    ContentBlocks(anthropic::MessagesResponse),
    /// Groq: `{"choices": [{"message": {"content": ...}}]}`
    Choices(groq::ChatCompletionResponse),
}

impl ProviderReply {
    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderReply::ContentBlocks(_) => ProviderKind::Anthropic,
            ProviderReply::Choices(_) => ProviderKind::Groq,
        }
    }

    /// The single completion text. A successful reply without any text is an
    /// error, not an empty completion.
    pub fn into_response(self) -> AiResult<ChatResponse> {
        let provider = self.provider();
        let text = match self {
            ProviderReply::ContentBlocks(reply) => reply.into_text(),
            ProviderReply::Choices(reply) => reply.into_text(),
        };

        match text.filter(|text| !text.trim().is_empty()) {
            Some(text) => Ok(ChatResponse { text }),
            None => EmptyResponseSnafu {
                provider: provider.display_name(),
            }
            .fail(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: Option<UpstreamErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorDetail {
    message: Option<String>,
}

/// Pulls `error.message` out of a provider's error body, if it has one.
pub(crate) fn upstream_error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<UpstreamErrorBody>(body)
        .ok()?
        .error?
        .message
        .filter(|message| !message.trim().is_empty())
}

/// Sends `body` and returns the raw reply, turning a non-2xx status into an
/// [StudyError::Upstream] that carries the provider's own status and message.
pub(crate) async fn send_json<B: Serialize + ?Sized>(
    provider: ProviderKind,
    request: RequestBuilder,
    body: &B,
) -> AiResult<Bytes> {
    let response = request.json(body).send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message =
            upstream_error_message(&bytes).unwrap_or_else(|| GENERIC_UPSTREAM_ERROR.to_string());
        warn!(
            provider = provider.display_name(),
            status = status.as_u16(),
            "provider rejected request: {message}"
        );
        return Err(StudyError::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    debug!(
        provider = provider.display_name(),
        bytes = bytes.len(),
        "provider replied"
    );
    Ok(bytes)
}

pub(crate) fn decode_reply<T: DeserializeOwned>(provider: ProviderKind, bytes: &[u8]) -> AiResult<T> {
    serde_json::from_slice(bytes).map_err(|err| StudyError::Upstream {
        status: 502,
        message: format!(
            "{} response was not valid JSON: {err}",
            provider.display_name()
        ),
    })
}
