//! Configuration structures.
//!
//! Configuration is loaded from environment variables, with serde support so
//! a config file can be layered on top by the embedding process.

use crate::registry::{CachePolicy, RateQuota};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Engine-wide defaults applied to tools that do not override them.
    #[serde(default)]
    pub engine: EngineDefaults,

    /// Workspace filesystem limits (read_file / write_file built-ins).
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Completion API client configuration (complete built-in).
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Search API client configuration (search built-in).
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Some(level) = env_string("MCP_ENGINE_LOG_LEVEL") {
            config.observability.log_level = level;
        }
        if let Some(secs) = env_parse::<u64>("MCP_ENGINE_CALL_TIMEOUT_SECS") {
            config.engine.call_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("MCP_ENGINE_CACHE_TTL_SECS") {
            config.engine.default_cache.ttl = Duration::from_secs(secs);
        }
        if let Some(max) = env_parse::<u32>("MCP_ENGINE_RATE_MAX_CALLS") {
            config.engine.default_quota.max_calls = max;
        }
        if let Some(secs) = env_parse::<u64>("MCP_ENGINE_RATE_WINDOW_SECS") {
            config.engine.default_quota.window = Duration::from_secs(secs);
        }
        if let Some(attempts) = env_parse::<u32>("MCP_ENGINE_RETRY_MAX_ATTEMPTS") {
            config.engine.retry.max_attempts = attempts;
        }
        if let Some(ms) = env_parse::<u64>("MCP_ENGINE_RETRY_BASE_DELAY_MS") {
            config.engine.retry.base_delay = Duration::from_millis(ms);
        }

        if let Some(root) = env_string("MCP_ENGINE_WORKSPACE_ROOT") {
            config.workspace.root = PathBuf::from(root);
        }
        if let Some(bytes) = env_parse::<u64>("MCP_ENGINE_MAX_FILE_BYTES") {
            config.workspace.max_file_bytes = bytes;
        }
        if let Some(exts) = env_string("MCP_ENGINE_ALLOWED_EXTENSIONS") {
            config.workspace.allowed_extensions =
                exts.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Some(url) = env_string("COMPLETION_API_URL") {
            config.completion.base_url = url;
        }
        config.completion.api_key = env_string("COMPLETION_API_KEY");
        if let Some(model) = env_string("COMPLETION_MODEL") {
            config.completion.model = model;
        }
        if let Some(max) = env_parse::<u32>("COMPLETION_MAX_TOKENS") {
            config.completion.max_tokens = max;
        }

        if let Some(url) = env_string("SEARCH_API_URL") {
            config.search.base_url = url;
        }
        config.search.api_key = env_string("SEARCH_API_KEY");
        if let Some(n) = env_parse::<u32>("SEARCH_DEFAULT_RESULTS") {
            config.search.default_results = n;
        }

        config
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Engine-wide defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDefaults {
    /// Per-attempt execution deadline for tools without their own timeout.
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,

    /// Deadline for a single cache-store operation; slower lookups degrade
    /// to a miss.
    #[serde(with = "humantime_serde")]
    pub cache_op_timeout: Duration,

    /// Retry policy for transient execution failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cache policy applied to tools that do not declare one.
    #[serde(default)]
    pub default_cache: CachePolicy,

    /// Rate quota applied to tools that do not declare one.
    #[serde(default)]
    pub default_quota: RateQuota,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            cache_op_timeout: Duration::from_secs(2),
            retry: RetryConfig::default(),
            default_cache: CachePolicy::default(),
            default_quota: RateQuota::default(),
        }
    }
}

/// Retry policy: up to `max_attempts` attempts, sleeping
/// `base_delay * attempt_number` between attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,

    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Workspace filesystem limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory all file paths resolve under.
    pub root: PathBuf,

    /// Maximum file size accepted for read or write.
    pub max_file_bytes: u64,

    /// File extensions (without dot) the filesystem tools accept.
    pub allowed_extensions: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_file_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec!["md".into(), "txt".into(), "json".into()],
        }
    }
}

/// Completion API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub base_url: String,

    /// Bearer key; absent means the built-in fails permanently at call time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.completion.example/v1/complete".to_string(),
            api_key: None,
            model: "default".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Search API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub base_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Result count used when the caller omits one.
    pub default_results: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.search.example/v1/search".to_string(),
            api_key: None,
            default_results: 5,
        }
    }
}
