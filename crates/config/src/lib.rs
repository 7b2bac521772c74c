//! Configuration loading, validation, and management for localmind.
//!
//! Loads configuration from `~/.localmind/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.localmind/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Language-model server settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Context retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Turn orchestration settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL, including the `/v1` suffix
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Local servers accept any key; sent as a bearer token
    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Per-request timeout for completions
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Timeout for the liveness probe
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
}

fn default_llm_url() -> String {
    "http://localhost:8000/v1".into()
}
fn default_model() -> String {
    "Qwen/Qwen2.5-7B-Instruct-AWQ".into()
}
fn default_api_key() -> String {
    "dummy".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_health_timeout() -> u64 {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            model: default_model(),
            api_key: default_api_key(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
            health_timeout_secs: default_health_timeout(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("health_timeout_secs", &self.health_timeout_secs)
            .finish()
    }
}

/// Which vector store backs the retriever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalBackend {
    /// Qdrant over its REST API
    Qdrant,
    /// Process-local index, lost on restart
    Memory,
    /// Retrieval disabled
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_backend")]
    pub backend: RetrievalBackend,

    /// Embedding service base URL (serves `POST /embed`)
    #[serde(default = "default_embed_url")]
    pub embed_url: String,

    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Embedding dimension used when creating the collection
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,

    /// Passages to prepend per turn
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,
}

fn default_backend() -> RetrievalBackend {
    RetrievalBackend::Qdrant
}
fn default_embed_url() -> String {
    "http://localhost:8081".into()
}
fn default_qdrant_url() -> String {
    "http://localhost:6333".into()
}
fn default_collection() -> String {
    "documents".into()
}
fn default_vector_size() -> usize {
    1024
}
fn default_limit() -> usize {
    3
}
fn default_score_threshold() -> f32 {
    0.7
}
fn default_retrieval_timeout() -> u64 {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            embed_url: default_embed_url(),
            qdrant_url: default_qdrant_url(),
            collection: default_collection(),
            vector_size: default_vector_size(),
            limit: default_limit(),
            score_threshold: default_score_threshold(),
            timeout_secs: default_retrieval_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Tool cycles allowed per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Send tool schemas with each completion request. Some model servers
    /// reject `tools` until function calling is enabled on their side.
    #[serde(default = "default_true")]
    pub send_tool_schemas: bool,

    /// Run the tool calls of one model response concurrently
    #[serde(default)]
    pub parallel_tools: bool,

    /// Send a tiny completion at startup so the first real turn is not cold
    #[serde(default = "default_true")]
    pub warm_up: bool,
}

fn default_max_iterations() -> u32 {
    3
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            send_tool_schemas: true,
            parallel_tools: false,
            warm_up: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// If set, file operations are confined to this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<String>,

    /// Path prefixes file operations may never touch
    #[serde(default = "default_forbidden_paths")]
    pub forbidden_paths: Vec<String>,

    /// Default search location for `search_logs`
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Command run by `apply_patch` after a patch applies cleanly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,

    /// Upper bound for subprocesses spawned by tools
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_forbidden_paths() -> Vec<String> {
    vec![
        "/etc".into(),
        "/proc".into(),
        "/sys".into(),
        "~/.ssh".into(),
        "~/.gnupg".into(),
        "~/.aws".into(),
    ]
}
fn default_log_dir() -> String {
    "./logs".into()
}
fn default_command_timeout() -> u64 {
    300
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            forbidden_paths: default_forbidden_paths(),
            log_dir: default_log_dir(),
            test_command: None,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path` and apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| {
            std::env::var(key)
                .or_else(|_| std::env::var(key.to_lowercase()))
                .ok()
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Recognised: `OPENAI_COMPAT_URL`, `LOCALMIND_MODEL`, `EMBED_URL`,
    /// `QDRANT_URL`, `LOG_LEVEL`, `TOOLS_DIR`, `LOCALMIND_MAX_ITERATIONS`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OPENAI_COMPAT_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("LOCALMIND_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("EMBED_URL") {
            self.retrieval.embed_url = url;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.retrieval.qdrant_url = url;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        if let Some(dir) = lookup("TOOLS_DIR") {
            self.tools.workspace_root = Some(dir);
        }
        if let Some(raw) = lookup("LOCALMIND_MAX_ITERATIONS") {
            self.orchestrator.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "LOCALMIND_MAX_ITERATIONS must be a non-negative integer, got '{raw}'"
                ))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".localmind")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.llm.health_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "llm timeouts must be greater than zero".into(),
            ));
        }

        if !(-1.0..=1.0).contains(&self.retrieval.score_threshold) {
            return Err(ConfigError::ValidationError(
                "retrieval.score_threshold must be between -1.0 and 1.0".into(),
            ));
        }

        if self.retrieval.limit == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.limit must be at least 1".into(),
            ));
        }

        if self.retrieval.vector_size == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.vector_size must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
pub fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.base_url, "http://localhost:8000/v1");
        assert_eq!(config.orchestrator.max_iterations, 3);
        assert_eq!(config.retrieval.backend, RetrievalBackend::Qdrant);
        assert_eq!(config.retrieval.vector_size, 1024);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.model, config.llm.model);
        assert_eq!(parsed.retrieval.collection, "documents");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_str = r#"
log_level = "debug"

[llm]
base_url = "http://gpu-box:8000/v1"

[retrieval]
backend = "memory"
limit = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.base_url, "http://gpu-box:8000/v1");
        assert_eq!(config.llm.model, "Qwen/Qwen2.5-7B-Instruct-AWQ");
        assert_eq!(config.retrieval.backend, RetrievalBackend::Memory);
        assert_eq!(config.retrieval.limit, 5);
        assert!((config.retrieval.score_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_limit_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_iterations_is_allowed() {
        let mut config = AppConfig::default();
        config.orchestrator.max_iterations = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.llm.model, "Qwen/Qwen2.5-7B-Instruct-AWQ");
    }

    #[test]
    fn load_from_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[orchestrator]\nmax_iterations = 7\nparallel_tools = true\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.orchestrator.max_iterations, 7);
        assert!(config.orchestrator.parallel_tools);
        assert!(config.orchestrator.send_tool_schemas);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nbase_url = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_COMPAT_URL", "http://vllm:8000/v1"),
            ("QDRANT_URL", "http://qdrant:6333"),
            ("LOG_LEVEL", "DEBUG"),
            ("LOCALMIND_MAX_ITERATIONS", "5"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.base_url, "http://vllm:8000/v1");
        assert_eq!(config.retrieval.qdrant_url, "http://qdrant:6333");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.orchestrator.max_iterations, 5);
        assert_eq!(config.retrieval.embed_url, "http://localhost:8081");
    }

    #[test]
    fn bad_iteration_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides(|k| {
            (k == "LOCALMIND_MAX_ITERATIONS").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = "sk-secret-value".into();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("localhost:8000"));
        assert!(toml_str.contains("documents"));
    }
}
