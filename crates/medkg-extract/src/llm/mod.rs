//! Remote model client speaking the OpenAI chat-completions format.

mod providers;

pub use providers::ModelProvider;

use anyhow::{Context, Result};
use async_trait::async_trait;
use medkg_core::config::LlmConfig;
use providers::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};

/// Sampling parameters for one completion request.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: Option<f64>,
    /// Ask the provider for a JSON object response where supported.
    pub json: bool,
}

impl GenerationOptions {
    /// Defaults for free-text answer generation.
    pub fn answer(max_tokens: u32) -> Self {
        Self { max_tokens, temperature: 0.7, top_p: Some(0.9), json: false }
    }

    /// Defaults for structured extraction: near-deterministic JSON output.
    pub fn structured(max_tokens: u32) -> Self {
        Self { max_tokens, temperature: 0.1, top_p: Some(0.95), json: true }
    }
}

/// The completion interface the extractor and QA service depend on.
/// Implemented by [`LlmClient`] and by scripted fakes in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a single-turn prompt and return the model's text completion.
    async fn generate(&self, prompt: &str, opts: &GenerationOptions) -> Result<String>;

    /// Model name for health reporting.
    fn model_name(&self) -> &str;
}

/// HTTP client for a remote chat-completion model.
pub struct LlmClient {
    provider: ModelProvider,
    http: reqwest::Client,
    answer_max_tokens: u32,
    json_max_tokens: u32,
}

impl LlmClient {
    pub fn new(provider: ModelProvider) -> Self {
        Self {
            provider,
            http: reqwest::Client::new(),
            answer_max_tokens: 512,
            json_max_tokens: 512,
        }
    }

    /// Create from an optional explicit API key plus config-driven settings.
    pub fn from_config(api_key: Option<String>, config: &LlmConfig) -> Result<Self> {
        let provider = ModelProvider::resolve(api_key, config)?;
        tracing::info!(
            provider = provider.provider_name(),
            model = provider.model_name(),
            "model client ready"
        );
        Ok(Self {
            provider,
            http: reqwest::Client::new(),
            answer_max_tokens: config.answer_max_tokens,
            json_max_tokens: config.json_max_tokens,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Send a prompt with answer-generation defaults.
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.generate(prompt, &GenerationOptions::answer(self.answer_max_tokens))
            .await
    }

    /// Send a prompt expecting a JSON value of type `T`. The JSON-only
    /// instruction is appended to the prompt and the response is parsed
    /// leniently; a response that still fails to parse is an error for the
    /// caller to drop or surface.
    pub async fn generate_json<T: serde::de::DeserializeOwned>(&self, prompt: &str) -> Result<T> {
        let prompt = format!("{}\n{}", prompt, crate::prompts::JSON_ONLY_SUFFIX);
        let response = self
            .generate(&prompt, &GenerationOptions::structured(self.json_max_tokens))
            .await?;
        parse_json_lenient(&response)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn generate(&self, prompt: &str, opts: &GenerationOptions) -> Result<String> {
        let req = ChatRequest {
            model: self.provider.model_name().to_string(),
            max_tokens: opts.max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(opts.temperature),
            top_p: opts.top_p,
            response_format: opts
                .json
                .then(|| ResponseFormat { format: "json_object".to_string() }),
        };

        let url = self.provider.endpoint();
        let mut request = self.http.post(&url).json(&req);
        if let Some(key) = self.provider.api_key() {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let resp = request.send().await.with_context(|| {
            format!("failed to call {} API at {}", self.provider.provider_name(), url)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", self.provider.provider_name(), status, text);
        }

        let body = resp.json::<ChatResponse>().await.with_context(|| {
            format!("failed to parse {} response", self.provider.provider_name())
        })?;

        body.choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("empty response from {}", self.provider.provider_name())
            })
    }

    fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

/// Send a prompt through any [`ChatModel`] expecting a JSON value of type
/// `T`. Mirrors [`LlmClient::generate_json`] for callers that only hold the
/// trait object.
pub async fn generate_json<T: serde::de::DeserializeOwned>(
    model: &dyn ChatModel,
    prompt: &str,
) -> Result<T> {
    let prompt = format!("{}\n{}", prompt, crate::prompts::JSON_ONLY_SUFFIX);
    let response = model
        .generate(&prompt, &GenerationOptions::structured(512))
        .await?;
    parse_json_lenient(&response)
}

/// Parse a JSON value out of a model response, tolerating the usual noise:
/// `<think>` blocks, markdown code fences, surrounding prose, and trailing
/// commas.
pub fn parse_json_lenient<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    let text = strip_think_blocks(text);
    let candidate = extract_json_span(&text);
    match serde_json::from_str(candidate) {
        Ok(parsed) => Ok(parsed),
        Err(_) => {
            let repaired = strip_trailing_commas(candidate);
            serde_json::from_str(&repaired).context("failed to parse model JSON response")
        }
    }
}

/// Locate the JSON payload within a response: prefer a fenced block, then
/// the first `{...}` or `[...]` span, then the trimmed text as-is.
fn extract_json_span(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let after = &text[start + "```json".len()..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    if let Some(start) = text.find("```") {
        let after = &text[start + "```".len()..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    // First object or array span embedded in prose
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(start) = text.find(open)
            && let Some(end) = text.rfind(close)
            && end > start
        {
            return text[start..=end].trim();
        }
    }
    trimmed
}

/// Remove commas that directly precede a closing brace or bracket. Runs
/// outside string literals only.
fn strip_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in json.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '}' | ']' => {
                // Drop a comma left dangling before this close
                let trimmed_len = out.trim_end().len();
                if out[..trimmed_len].ends_with(',') {
                    out.truncate(trimmed_len - 1);
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Strip `<think>...</think>` blocks that reasoning models emit.
pub fn strip_think_blocks(text: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find("<think>") {
        if let Some(end_offset) = result[start..].find("</think>") {
            let end = start + end_offset + "</think>".len();
            result = format!("{}{}", &result[..start], &result[end..]);
        } else {
            // Unclosed think block: truncate from <think> onward
            result.truncate(start);
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_parse_plain_json() {
        let v: Value = parse_json_lenient(r#"{"entities": []}"#).unwrap();
        assert!(v["entities"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "Here you go:\n```json\n{\"entities\": [{\"name\": \"diabetes\", \"type\": \"disease\"}]}\n```\nDone.";
        let v: Value = parse_json_lenient(text).unwrap();
        assert_eq!(v["entities"][0]["name"], "diabetes");
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let text = "The answer is {\"category\": \"treatment\"} as requested.";
        let v: Value = parse_json_lenient(text).unwrap();
        assert_eq!(v["category"], "treatment");
    }

    #[test]
    fn test_parse_array_response() {
        let v: Value = parse_json_lenient("[\"treats\", \"prevents\"]").unwrap();
        assert_eq!(v.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_trailing_commas_repaired() {
        let text = r#"{"entities": [{"name": "insulin", "type": "drug"},],}"#;
        let v: Value = parse_json_lenient(text).unwrap();
        assert_eq!(v["entities"][0]["type"], "drug");
    }

    #[test]
    fn test_comma_inside_string_untouched() {
        let text = r#"{"description": "a, b,]"}"#;
        let v: Value = parse_json_lenient(text).unwrap();
        assert_eq!(v["description"], "a, b,]");
    }

    #[test]
    fn test_think_blocks_stripped() {
        let text = "<think>reasoning about diabetes</think>{\"entities\": []}";
        let v: Value = parse_json_lenient(text).unwrap();
        assert!(v["entities"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unclosed_think_block_truncated() {
        assert_eq!(strip_think_blocks("ok <think>never ends"), "ok ");
    }

    #[test]
    fn test_garbage_is_error_not_panic() {
        let result: Result<Value> = parse_json_lenient("I cannot answer that.");
        assert!(result.is_err());
    }
}
