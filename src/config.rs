use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub mint: MintConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountsConfig {
    pub bots_file: PathBuf,
    pub proxies_file: PathBuf,
    pub status_file: PathBuf,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            bots_file: PathBuf::from("bots.txt"),
            proxies_file: PathBuf::from("proxies.txt"),
            status_file: PathBuf::from("status.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformConfig {
    pub api_base: String,
    pub submolt: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.moltbook.com/api/v1".to_string(),
            submolt: "tokens".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum LlmBackend {
    ClaudeApi,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub ollama_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::ClaudeApi,
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from config or the ANTHROPIC_API_KEY variable
    pub fn resolve_api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .context("LLM API key not found. Set ANTHROPIC_API_KEY or add llm.api_key to config")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MintConfig {
    pub protocol: String,
    pub ticker: String,
    pub amount: u64,
    pub wallet: String,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            protocol: "molt-20".to_string(),
            ticker: "MOLT".to_string(),
            amount: 1000,
            wallet: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    /// Cooldown applied after a successful mint when the platform gives no hint
    pub default_cooldown_secs: u64,
    /// Fixed sleep between ticks when adaptive sleeping is off
    pub tick_interval_secs: u64,
    /// Sleep until the nearest bot's eligibility instead of a fixed interval
    pub adaptive: bool,
    pub min_sleep_secs: u64,
    pub max_sleep_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_cooldown_secs: 1800,
            tick_interval_secs: 60,
            adaptive: false,
            min_sleep_secs: 10,
            max_sleep_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub max_redirects: usize,
    /// Proxies apply only to TLS requests unless this is set
    pub proxy_plain_http: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 2000,
            max_redirects: 5,
            proxy_plain_http: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;
        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config TOML")
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Write configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config to TOML")?;
        std::fs::write(path.as_ref(), contents)
            .context("Failed to write config file")?;
        Ok(())
    }
}
