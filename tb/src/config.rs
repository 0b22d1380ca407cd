//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the local inference binary
pub const ENV_LLAMA_EXE: &str = "PCLOCAL_LLAMA_EXE";
/// Environment variable naming the model file for the local inference binary
pub const ENV_LLAMA_MODEL: &str = "PCLOCAL_LLAMA_MODEL";
/// Environment variable with the thread count for the local inference binary
pub const ENV_LLAMA_THREAD: &str = "PCLOCAL_LLAMA_THREAD";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where thought templates live
    pub store: StoreConfig,

    /// How the language model is reached
    pub gateway: GatewayConfig,

    /// Prompt template overrides
    pub prompts: PromptsConfig,

    /// Seed for arbitration coin flips (random when absent)
    pub seed: Option<u64>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .thoughtbuffer.yml
        let local_config = PathBuf::from(".thoughtbuffer.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/thoughtbuffer/thoughtbuffer.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("thoughtbuffer").join("thoughtbuffer.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load_file_chain(config_path).ok().and_then(|c| c.log_level)
    }

    /// Apply `PCLOCAL_LLAMA_*` overrides to the command gateway
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let command = &mut self.gateway.command;
        if let Some(exe) = lookup(ENV_LLAMA_EXE).filter(|v| !v.is_empty()) {
            debug!(%exe, "apply_env: program override");
            command.program = exe;
        }
        if let Some(model) = lookup(ENV_LLAMA_MODEL).filter(|v| !v.is_empty()) {
            debug!(%model, "apply_env: model override");
            command.model = model;
        }
        if let Some(threads) = lookup(ENV_LLAMA_THREAD) {
            match threads.trim().parse::<u32>() {
                Ok(n) if n > 0 => command.threads = n,
                _ => tracing::warn!("Ignoring invalid {}={}", ENV_LLAMA_THREAD, threads),
            }
        }
    }
}

/// Template store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one JSON record per template
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("thought_templates"),
        }
    }
}

/// Model gateway selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Provider name: "command" or "openai"
    pub provider: String,

    /// Local inference binary settings
    pub command: CommandConfig,

    /// OpenAI-compatible HTTP settings
    pub openai: OpenAiConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: "command".to_string(),
            command: CommandConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// Local inference binary (llama.cpp style)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Executable to run
    pub program: String,

    /// Model file passed as `{{model}}`
    pub model: String,

    /// Thread count passed as `{{threads}}`
    pub threads: u32,

    /// Argument templates; `{{model}}`, `{{threads}}`, `{{prompt}}`, `{{system}}`, `{{user}}`
    pub args: Vec<String>,

    /// Template turning `{{system}}` and `{{user}}` into the single `{{prompt}}`
    #[serde(rename = "chat-format")]
    pub chat_format: String,

    /// Kill the process after this many milliseconds (no limit when absent)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: Option<u64>,
}

/// Phi-3 instruct chat format
pub const PHI3_CHAT_FORMAT: &str =
    "{{#if system}}<|system|>\n{{system}}<|end|>\n{{/if}}<|user|>\n{{user}}<|end|>\n<|assistant|>\n";

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            program: "llama-cli".to_string(),
            model: String::new(),
            threads: 8,
            args: [
                "-m",
                "{{model}}",
                "-t",
                "{{threads}}",
                "--no-display-prompt",
                "-no-cnv",
                "-p",
                "{{prompt}}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            chat_format: PHI3_CHAT_FORMAT.to_string(),
            timeout_ms: None,
        }
    }
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Model identifier
    pub model: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 4096,
            timeout_ms: 300_000,
        }
    }
}

impl OpenAiConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("API key not found. Set the {} environment variable.", self.api_key_env))
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory whose `{name}.pmt` files shadow the embedded prompts
    pub dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".thoughtbuffer/prompts"),
        }
    }
}
