//! Model provider configuration and chat-completions wire types.

use anyhow::{Context, Result};
use medkg_core::config::LlmConfig;
use serde::{Deserialize, Serialize};

/// Remote model provider. Every provider speaks the OpenAI chat-completions
/// wire format; only the base URL and auth differ.
#[derive(Debug, Clone)]
pub enum ModelProvider {
    DeepSeek {
        api_key: String,
        model: String,
    },
    OpenAi {
        api_key: String,
        model: String,
    },
    /// Any OpenAI-compatible API with Bearer token auth.
    OpenAiCompatible {
        api_key: String,
        base_url: String,
        model: String,
    },
    /// Local OpenAI-compatible server (Ollama, LM Studio, vLLM). No key.
    Local {
        base_url: String,
        model: String,
    },
}

impl ModelProvider {
    /// Resolve a provider from an explicit API key (always DeepSeek, the
    /// system's default provider) or from the environment.
    ///
    /// Priority chain:
    /// 1. explicit `api_key` argument -> DeepSeek
    /// 2. `config.provider` forced -> that provider
    /// 3. `DEEPSEEK_API_KEY` -> DeepSeek
    /// 4. `OPENAI_API_KEY` -> OpenAI
    /// 5. `MEDKG_API_KEY` + `MEDKG_BASE_URL` -> any OpenAI-compatible API
    /// 6. `MEDKG_LOCAL_URL` -> local server
    /// 7. Error listing the options
    pub fn resolve(api_key: Option<String>, config: &LlmConfig) -> Result<Self> {
        let model = std::env::var("MEDKG_MODEL").unwrap_or_else(|_| config.model.clone());

        if let Some(key) = api_key {
            return Ok(Self::DeepSeek { api_key: key, model });
        }
        if let Some(ref forced) = config.provider {
            return Self::from_forced_provider(forced, &model, config);
        }
        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            return Ok(Self::DeepSeek { api_key: key, model });
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            return Ok(Self::OpenAi { api_key: key, model });
        }
        if let Ok(key) = std::env::var("MEDKG_API_KEY") {
            let base_url =
                std::env::var("MEDKG_BASE_URL").unwrap_or_else(|_| config.local_url.clone());
            return Ok(Self::OpenAiCompatible { api_key: key, base_url, model });
        }
        if let Ok(url) = std::env::var("MEDKG_LOCAL_URL") {
            return Ok(Self::Local { base_url: url, model });
        }

        anyhow::bail!(
            "No model provider available. Options:\n\
             - Set DEEPSEEK_API_KEY (or pass --api-key) for DeepSeek\n\
             - Set OPENAI_API_KEY for OpenAI\n\
             - Set MEDKG_API_KEY and MEDKG_BASE_URL for any OpenAI-compatible API\n\
             - Set MEDKG_LOCAL_URL for a local server (Ollama, LM Studio, vLLM)"
        )
    }

    /// Resolve a forced provider name to a provider instance.
    fn from_forced_provider(provider: &str, model: &str, config: &LlmConfig) -> Result<Self> {
        match provider {
            "deepseek" => {
                let key = std::env::var("DEEPSEEK_API_KEY")
                    .context("provider = \"deepseek\" but DEEPSEEK_API_KEY not set")?;
                Ok(Self::DeepSeek { api_key: key, model: model.to_string() })
            }
            "openai" => {
                let key = std::env::var("OPENAI_API_KEY")
                    .context("provider = \"openai\" but OPENAI_API_KEY not set")?;
                Ok(Self::OpenAi { api_key: key, model: model.to_string() })
            }
            "openai-compatible" => {
                let key = std::env::var("MEDKG_API_KEY")
                    .context("provider = \"openai-compatible\" but MEDKG_API_KEY not set")?;
                let url =
                    std::env::var("MEDKG_BASE_URL").unwrap_or_else(|_| config.local_url.clone());
                Ok(Self::OpenAiCompatible {
                    api_key: key,
                    base_url: url,
                    model: model.to_string(),
                })
            }
            "local" => {
                let url =
                    std::env::var("MEDKG_LOCAL_URL").unwrap_or_else(|_| config.local_url.clone());
                Ok(Self::Local { base_url: url, model: model.to_string() })
            }
            other => anyhow::bail!(
                "Unknown provider '{}'. Valid: deepseek, openai, openai-compatible, local",
                other
            ),
        }
    }

    /// Chat-completions endpoint URL for this provider.
    pub fn endpoint(&self) -> String {
        match self {
            Self::DeepSeek { .. } => "https://api.deepseek.com/chat/completions".to_string(),
            Self::OpenAi { .. } => "https://api.openai.com/v1/chat/completions".to_string(),
            Self::OpenAiCompatible { base_url, .. } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
            Self::Local { base_url, .. } => {
                format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
            }
        }
    }

    /// Bearer token, if the provider requires one.
    pub fn api_key(&self) -> Option<&str> {
        match self {
            Self::DeepSeek { api_key, .. }
            | Self::OpenAi { api_key, .. }
            | Self::OpenAiCompatible { api_key, .. } => Some(api_key),
            Self::Local { .. } => None,
        }
    }

    /// Human-readable provider name.
    pub fn provider_name(&self) -> &str {
        match self {
            Self::DeepSeek { .. } => "DeepSeek",
            Self::OpenAi { .. } => "OpenAI",
            Self::OpenAiCompatible { .. } => "OpenAI-Compatible",
            Self::Local { .. } => "Local",
        }
    }

    /// Model name in use.
    pub fn model_name(&self) -> &str {
        match self {
            Self::DeepSeek { model, .. }
            | Self::OpenAi { model, .. }
            | Self::OpenAiCompatible { model, .. }
            | Self::Local { model, .. } => model,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub format: String,
}

#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoiceMessage {
    pub content: String,
}
