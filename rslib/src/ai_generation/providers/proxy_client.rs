use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::ai_generation::{AiResult, ChatResponse, CompletionRequest};
use crate::error::{EmptyResponseSnafu, StudyError};

use super::{http_client, upstream_error_message, AiProvider};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/claude";
const PROXY_NAME: &str = "the AI proxy";

/// Calls a running completion proxy instead of a provider. The proxy holds
/// the credential, so the client needs none.
pub struct ProxyClient {
    client: Client,
    endpoint: String,
}

impl ProxyClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AiResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProxyReply {
    text: Option<String>,
}

#[async_trait::async_trait]
impl AiProvider for ProxyClient {
    async fn complete(&self, request: &CompletionRequest) -> AiResult<ChatResponse> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(StudyError::Upstream {
                status: status.as_u16(),
                message: upstream_error_message(&bytes).unwrap_or_else(|| "API error".to_string()),
            });
        }

        let reply: ProxyReply =
            serde_json::from_slice(&bytes).map_err(|err| StudyError::Upstream {
                status: 502,
                message: format!("{PROXY_NAME} returned an unexpected body: {err}"),
            })?;
        match reply.text.filter(|text| !text.trim().is_empty()) {
            Some(text) => Ok(ChatResponse { text }),
            None => EmptyResponseSnafu {
                provider: PROXY_NAME,
            }
            .fail(),
        }
    }
}
