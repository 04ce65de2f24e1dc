//! Assistant configuration: optional `coach_config.toml`, then `PAGI_COACH_*` env overrides.

use crate::generation::{DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::rollout::RolloutConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "coach_config.toml";
pub const DEFAULT_DATA_PATH: &str = "./data/coach";
pub const DEFAULT_BIND: &str = "127.0.0.1:8010";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub modern_enabled: bool,
    pub modern_allowlist: Vec<String>,
    pub llm: LlmConfig,
    /// Base URL of the user-context service; none means an empty context for everyone.
    pub user_context_url: Option<String>,
    pub data_path: PathBuf,
    pub bind: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            modern_enabled: false,
            modern_allowlist: Vec::new(),
            llm: LlmConfig::default(),
            user_context_url: None,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl AssistantConfig {
    /// File (when present) then environment. The file path comes from `PAGI_COACH_CONFIG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env_opt_string("PAGI_COACH_CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::load_from_path(Path::new(&path))?;
        config.apply_env(env_opt_string);
        Ok(config)
    }

    /// Missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from a variable lookup (`std::env` in production).
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("PAGI_COACH_MODERN_ENABLED") {
            self.modern_enabled = parse_bool(&v, self.modern_enabled);
        }
        if let Some(v) = var("PAGI_COACH_MODERN_ALLOWLIST") {
            self.modern_allowlist = RolloutConfig::parse_allowlist(&v).into_iter().collect();
        }
        if let Some(key) = var("OPENROUTER_API_KEY").or_else(|| var("PAGI_LLM_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = var("PAGI_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = var("PAGI_LLM_API_URL") {
            self.llm.api_url = url;
        }
        if let Some(secs) = var("PAGI_COACH_LLM_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            self.llm.timeout_secs = secs;
        }
        if let Some(url) = var("PAGI_COACH_USER_CONTEXT_URL") {
            self.user_context_url = Some(url);
        }
        if let Some(path) = var("PAGI_COACH_DATA_PATH") {
            self.data_path = PathBuf::from(path);
        }
        if let Some(bind) = var("PAGI_COACH_BIND") {
            self.bind = bind;
        }
    }

    pub fn rollout(&self) -> RolloutConfig {
        RolloutConfig::new(self.modern_enabled, self.modern_allowlist.iter().cloned())
    }
}

fn parse_bool(v: &str, default: bool) -> bool {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
