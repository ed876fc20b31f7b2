//! Configuration management for Confer
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (CONFER_*, with the conventional OpenAI-style
//!    names accepted as fallbacks)
//! 3. Config file (~/.config/confer/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::Strategy;
use crate::{Error, Result};

/// Model endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base address of an OpenAI-compatible API (including `/v1`)
    pub api_base: String,

    /// Bearer credential, if the endpoint needs one
    pub api_key: Option<String>,

    /// Model name sent with every request
    pub model: String,

    /// Sampling temperature for free-text calls
    pub temperature: f32,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "qwen".to_string(),
            temperature: 0.0,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable-store address (`sqlite://...` or a file path)
    pub database_url: Option<String>,

    /// Use the durable store when an address is configured
    pub use_database: bool,

    /// Directory for the flat-file summary cache
    pub summary_cache_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            use_database: true,
            summary_cache_dir: PathBuf::from(".cache/agent_memory"),
        }
    }
}

impl StorageConfig {
    /// The durable-store address to try at startup, if any
    pub fn durable_address(&self) -> Option<&str> {
        if !self.use_database {
            return None;
        }
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Controller and agent loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Which controller design to run
    pub strategy: Strategy,

    /// Controller evaluations allowed per turn
    pub max_iterations: usize,

    /// Model calls allowed when a structured result is required
    pub max_structured_attempts: usize,

    /// Tool rounds a sub-agent may run before it must summarize
    pub max_tool_rounds: usize,

    /// Root directory the file and git tools are confined to
    pub workspace_root: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_iterations: 3,
            max_structured_attempts: 3,
            max_tool_rounds: 8,
            workspace_root: PathBuf::from("."),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Interactive chat configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Thread key used for every line typed into the chat loop
    pub thread_id: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            thread_id: "main_thread".to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub orchestrator: OrchestratorConfig,
    pub server: ServerConfig,
    pub chat: ChatConfig,
}

/// Values given on the command line
///
/// Every field is optional; only the ones set override the loaded config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub database_url: Option<String>,
    pub no_database: bool,
    pub summary_cache_dir: Option<PathBuf>,
    pub strategy: Option<Strategy>,
    pub max_iterations: Option<usize>,
    pub workspace_root: Option<PathBuf>,
    pub bind: Option<String>,
    pub thread_id: Option<String>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/confer/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("confer").join("config.toml"))
    }

    /// Apply environment variable overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    ///
    /// Supported variables (fallback name in parentheses):
    /// - CONFER_API_BASE (OPENAI_API_BASE)
    /// - CONFER_API_KEY (OPENAI_API_KEY)
    /// - CONFER_MODEL (MODEL)
    /// - CONFER_DATABASE_URL (DATABASE_URL)
    /// - CONFER_USE_DATABASE
    /// - CONFER_SUMMARY_CACHE_DIR (LONG_TERM_MEMORY_DIR)
    /// - CONFER_STRATEGY
    /// - CONFER_MAX_ITERATIONS
    /// - CONFER_WORKSPACE
    /// - CONFER_BIND
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |primary: &str, fallback: Option<&str>| {
            lookup(primary)
                .or_else(|| fallback.and_then(&lookup))
                .filter(|v| !v.is_empty())
        };

        if let Some(api_base) = var("CONFER_API_BASE", Some("OPENAI_API_BASE")) {
            self.llm.api_base = api_base;
        }
        if let Some(api_key) = var("CONFER_API_KEY", Some("OPENAI_API_KEY")) {
            self.llm.api_key = Some(api_key);
        }
        if let Some(model) = var("CONFER_MODEL", Some("MODEL")) {
            self.llm.model = model;
        }
        if let Some(url) = var("CONFER_DATABASE_URL", Some("DATABASE_URL")) {
            self.storage.database_url = Some(url);
        }
        if let Some(flag) = var("CONFER_USE_DATABASE", None) {
            match parse_bool(&flag) {
                Some(value) => self.storage.use_database = value,
                None => tracing::warn!(value = %flag, "Ignoring invalid CONFER_USE_DATABASE"),
            }
        }
        if let Some(dir) = var("CONFER_SUMMARY_CACHE_DIR", Some("LONG_TERM_MEMORY_DIR")) {
            self.storage.summary_cache_dir = PathBuf::from(dir);
        }
        if let Some(strategy) = var("CONFER_STRATEGY", None) {
            match strategy.parse() {
                Ok(value) => self.orchestrator.strategy = value,
                Err(e) => tracing::warn!(error = %e, "Ignoring invalid CONFER_STRATEGY"),
            }
        }
        if let Some(max) = var("CONFER_MAX_ITERATIONS", None) {
            match max.parse() {
                Ok(value) => self.orchestrator.max_iterations = value,
                Err(_) => tracing::warn!(value = %max, "Ignoring invalid CONFER_MAX_ITERATIONS"),
            }
        }
        if let Some(root) = var("CONFER_WORKSPACE", None) {
            self.orchestrator.workspace_root = PathBuf::from(root);
        }
        if let Some(bind) = var("CONFER_BIND", None) {
            self.server.bind = bind;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, cli: CliOverrides) -> Self {
        if let Some(api_base) = cli.api_base {
            self.llm.api_base = api_base;
        }
        if let Some(api_key) = cli.api_key {
            self.llm.api_key = Some(api_key);
        }
        if let Some(model) = cli.model {
            self.llm.model = model;
        }
        if let Some(url) = cli.database_url {
            self.storage.database_url = Some(url);
        }
        if cli.no_database {
            self.storage.use_database = false;
        }
        if let Some(dir) = cli.summary_cache_dir {
            self.storage.summary_cache_dir = dir;
        }
        if let Some(strategy) = cli.strategy {
            self.orchestrator.strategy = strategy;
        }
        if let Some(max) = cli.max_iterations {
            self.orchestrator.max_iterations = max;
        }
        if let Some(root) = cli.workspace_root {
            self.orchestrator.workspace_root = root;
        }
        if let Some(bind) = cli.bind {
            self.server.bind = bind;
        }
        if let Some(thread_id) = cli.thread_id {
            self.chat.thread_id = thread_id;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(config_path: Option<&Path>, cli: CliOverrides) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };
        Ok(base.with_env_overrides().with_cli_overrides(cli))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
