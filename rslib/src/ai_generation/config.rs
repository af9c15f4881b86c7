use std::time::Duration;
use std::{env, fmt};

use serde::Deserialize;

use crate::ai_generation::{AiResult, ProviderKind, DEFAULT_MAX_TOKENS};
use crate::error::StudyError;

pub const ENV_PREFIX: &str = "STUDYDESK_";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A provider credential. Never printed: its `Debug` form is masked and it has
/// no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank input.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Which provider to call and how.
#[derive(Debug, Clone, Default)]
pub struct AiGenerationConfig {
    pub provider: ProviderKind,
    pub api_key: Option<ApiKey>,
    pub model: Option<String>,
    /// Overrides the provider's public endpoint; tests point this at a mock.
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl AiGenerationConfig {
    /// Reads `STUDYDESK_*` settings plus the selected provider's credential
    /// variable from the process environment.
    pub fn from_env() -> AiResult<Self> {
        Self::from_vars(env::vars())
    }

    pub fn from_vars<I>(vars: I) -> AiResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let stored: StoredAiGenerationConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars.iter().cloned())
            .map_err(|err| StudyError::Configuration {
                message: format!("invalid {ENV_PREFIX}* setting: {err}"),
            })?;

        let credential_var = stored.provider.credential_var();
        let api_key = vars
            .iter()
            .find(|(name, _)| name == credential_var)
            .and_then(|(_, value)| ApiKey::new(value));

        Ok(AiGenerationConfig {
            provider: stored.provider,
            api_key,
            model: stored.model.filter(|model| !model.trim().is_empty()),
            base_url: stored.base_url.filter(|url| !url.trim().is_empty()),
            max_tokens: stored.max_tokens.filter(|tokens| *tokens > 0),
            timeout_secs: stored.timeout_secs,
        })
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StoredAiGenerationConfig {
    #[serde(default)]
    provider: ProviderKind,
    model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}
