//! Configuration management for Colloquy
//!
//! Handles loading and saving application configuration, including the
//! orchestration knobs (retry budget, intent window, approval list) and
//! provider settings. The core never reads ambient global state: a `Config`
//! is built once and handed to the turn loop at construction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider settings
    pub provider: ProviderConfig,
    /// Turn orchestration settings
    pub orchestration: OrchestrationConfig,
    /// External service API keys (env vars take precedence)
    pub keys: ApiKeys,
    /// Override for the data directory (threads, user files)
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            orchestration: OrchestrationConfig::default(),
            keys: ApiKeys::default(),
            data_dir: None,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider id understood by the genai client (e.g. "groq", "openai")
    pub provider: String,
    /// Model name; None uses the provider default
    pub model: Option<String>,
    /// Sampling temperature for the main model
    pub temperature: f64,
    /// API key; falls back to the provider's environment variable
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: None,
            temperature: 0.5,
            api_key: None,
        }
    }
}

/// Knobs recognized by the turn orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// How many completed turns the intent classifier sees
    pub intent_window_turns: usize,
    /// Malformed-call retry budget per user turn
    pub max_schema_retries: u32,
    /// Tools that suspend the turn for human approval
    pub tools_requiring_approval: HashSet<String>,
    /// Master toggle for the approval gate; when false every tool is
    /// auto-approved regardless of the list above
    pub human_in_loop: bool,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        let mut approval = HashSet::new();
        approval.insert("file_operations".to_string());
        approval.insert("web_search".to_string());
        Self {
            intent_window_turns: 5,
            max_schema_retries: 3,
            tools_requiring_approval: approval,
            human_in_loop: true,
        }
    }
}

/// API keys for external tool services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openweather: Option<String>,
    pub tavily: Option<String>,
}

impl ApiKeys {
    /// Resolve the OpenWeather key (env var wins)
    pub fn openweather_key(&self) -> Option<String> {
        std::env::var("OPENWEATHER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.openweather.clone())
    }

    /// Resolve the Tavily key (env var wins)
    pub fn tavily_key(&self) -> Option<String> {
        std::env::var("TAVILY_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.tavily.clone())
    }
}

impl Config {
    /// Default config file path (~/.config/colloquy/config.toml or similar)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("colloquy"))
            .unwrap_or_else(|| PathBuf::from(".colloquy"))
            .join("config.toml")
    }

    /// Load configuration from the given path, or defaults if absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to the given path, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("serialize config: {}", e)))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Base data directory (threads, user files)
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|p| p.join("colloquy"))
                .unwrap_or_else(|| PathBuf::from(".colloquy"))
        })
    }

    /// Directory for the file_operations tool sandbox
    pub fn user_files_dir(&self) -> PathBuf {
        self.data_dir().join("user_files")
    }

    /// Directory for persisted conversation threads
    pub fn threads_dir(&self) -> PathBuf {
        self.data_dir().join("threads")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.orchestration.intent_window_turns, 5);
        assert_eq!(config.orchestration.max_schema_retries, 3);
        assert!(config
            .orchestration
            .tools_requiring_approval
            .contains("web_search"));
        assert!(config
            .orchestration
            .tools_requiring_approval
            .contains("file_operations"));
        assert!(config.orchestration.human_in_loop);
    }

    #[test]
    fn roundtrip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.orchestration.max_schema_retries = 5;
        config.provider.model = Some("llama-3.3-70b-versatile".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.orchestration.max_schema_retries, 5);
        assert_eq!(
            loaded.provider.model.as_deref(),
            Some("llama-3.3-70b-versatile")
        );
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let loaded = Config::load(Path::new("/nonexistent/colloquy.toml")).unwrap();
        assert_eq!(loaded.orchestration.intent_window_turns, 5);
    }
}
