//! Configuration for extraction, serving, and visualization.
//!
//! Load order: `medkg.toml` → environment variables → defaults. API keys are
//! never read from the config file; they come from the environment or CLI.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedkgConfig {
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub server: ServerConfig,
    pub visualization: VizConfig,
}

/// Remote model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Force a provider: "deepseek", "openai", "openai-compatible", "local".
    /// When unset, providers are resolved from available API keys.
    pub provider: Option<String>,
    /// Model name. Overridden by MEDKG_MODEL.
    pub model: String,
    /// Base URL for local / OpenAI-compatible servers.
    pub local_url: String,
    /// Token cap for free-text answers.
    pub answer_max_tokens: u32,
    /// Token cap for structured (JSON) extraction calls.
    pub json_max_tokens: u32,
}

/// Extraction pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum characters per text chunk sent for entity extraction.
    pub chunk_size: usize,
    /// Maximum entity pairs probed per (source category, target category).
    pub max_pairs: usize,
    /// Relations below this confidence are dropped.
    pub min_confidence: f64,
    /// Write entity/relation checkpoints every N documents.
    pub checkpoint_interval: usize,
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Visualization output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    /// Nodes above this count are truncated in exports.
    pub max_nodes: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: "deepseek-chat".to_string(),
            local_url: "http://localhost:11434".to_string(),
            answer_max_tokens: 512,
            json_max_tokens: 512,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            max_pairs: 5,
            min_confidence: 0.6,
            checkpoint_interval: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for VizConfig {
    fn default() -> Self {
        Self { max_nodes: 100 }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl MedkgConfig {
    /// Load config from `medkg.toml` in the given directory, with env var
    /// overrides. Falls back to defaults if no config file exists.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("medkg.toml");

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override("MEDKG_MODEL", &mut config.llm.model);
        env_override("MEDKG_CHUNK_SIZE", &mut config.extraction.chunk_size);
        env_override("MEDKG_MAX_PAIRS", &mut config.extraction.max_pairs);
        env_override("MEDKG_MIN_CONFIDENCE", &mut config.extraction.min_confidence);
        env_override("MEDKG_PORT", &mut config.server.port);
        env_override("MEDKG_MAX_NODES", &mut config.visualization.max_nodes);

        if !(0.0..=1.0).contains(&config.extraction.min_confidence) {
            anyhow::bail!(
                "min_confidence ({}) must be between 0.0 and 1.0",
                config.extraction.min_confidence
            );
        }

        Ok(config)
    }
}
