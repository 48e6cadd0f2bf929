use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatcher::DEFAULT_ENDPOINTS;
use crate::errors::ConfigError;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::types::{GenerationConfig, SafetySetting};

/// Application name used for config and data directories
pub const APP_NAME: &str = "gemini-chat";

/// Environment variable consulted for the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration struct for the chat client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub endpoints: Option<Vec<String>>,
    pub temperature: Option<f64>,
    pub top_k: Option<u32>,
    pub top_p: Option<f64>,
    pub max_output_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub history_limit: Option<usize>,
    pub max_message_length: Option<usize>,
    pub log_level: Option<String>,
    pub data_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let generation = GenerationConfig::default();
        Self {
            api_key: None,
            endpoints: Some(DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect()),
            temperature: Some(generation.temperature),
            top_k: Some(generation.top_k),
            top_p: Some(generation.top_p),
            max_output_tokens: Some(generation.max_output_tokens),
            timeout_secs: Some(30),
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            max_message_length: Some(4000),
            log_level: Some("warn".to_string()),
            data_dir: None,
            safety_settings: Vec::new(),
        }
    }
}

impl ChatConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(Self::default().merge(&config))
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string(self)?;

        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            endpoints: other.endpoints.clone().or_else(|| self.endpoints.clone()),
            temperature: other.temperature.or(self.temperature),
            top_k: other.top_k.or(self.top_k),
            top_p: other.top_p.or(self.top_p),
            max_output_tokens: other.max_output_tokens.or(self.max_output_tokens),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            history_limit: other.history_limit.or(self.history_limit),
            max_message_length: other.max_message_length.or(self.max_message_length),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            data_dir: other.data_dir.clone().or_else(|| self.data_dir.clone()),
            safety_settings: if other.safety_settings.is_empty() {
                self.safety_settings.clone()
            } else {
                other.safety_settings.clone()
            },
        }
    }

    /// Apply `GEMINI_API_KEY` from the environment (or a `.env` file) when set.
    pub fn with_env(mut self) -> Self {
        dotenvy::dotenv().ok();
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = Some(key.trim().to_string());
            }
        }
        self
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect())
    }

    pub fn generation_config(&self) -> GenerationConfig {
        let defaults = GenerationConfig::default();
        GenerationConfig {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            max_output_tokens: self.max_output_tokens.unwrap_or(defaults.max_output_tokens),
            stop_sequences: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }

    pub fn max_message_length(&self) -> usize {
        self.max_message_length.unwrap_or(4000)
    }

    /// Directory holding the key-value store
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_default_data_dir(APP_NAME),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> Result<PathBuf, ConfigError> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}

/// Helper function to get default data directory
pub fn get_default_data_dir(app_name: &str) -> Result<PathBuf, ConfigError> {
    match dirs::data_dir() {
        Some(dir) => Ok(dir.join(app_name)),
        None => Ok(get_default_config_dir(app_name)?.join("data")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = ChatConfig::load_from_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ChatConfig::default());
        assert_eq!(config.endpoints().len(), 3);
        assert_eq!(config.history_limit(), 50);
        assert_eq!(config.max_message_length(), 4000);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            temperature = 0.2
            endpoints = ["http://localhost:8080/generate"]

            [[safety_settings]]
            category = "HARM_CATEGORY_HARASSMENT"
            threshold = "BLOCK_MEDIUM_AND_ABOVE"
            "#,
        )
        .unwrap();

        let config = ChatConfig::load_from_file(&path).unwrap();
        assert_eq!(config.endpoints(), vec!["http://localhost:8080/generate".to_string()]);
        let generation = config.generation_config();
        assert_eq!(generation.temperature, 0.2);
        assert_eq!(generation.top_k, 40);
        assert_eq!(config.safety_settings.len(), 1);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "temperature = [").unwrap();
        assert!(matches!(
            ChatConfig::load_from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = ChatConfig::default();
        config.api_key = Some("abc".to_string());
        config.history_limit = Some(10);

        config.save_to_file(&path).unwrap();
        let reloaded = ChatConfig::load_from_file(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = ChatConfig::default();
        let other = ChatConfig {
            api_key: Some("override".to_string()),
            endpoints: None,
            temperature: None,
            top_k: Some(10),
            top_p: None,
            max_output_tokens: None,
            timeout_secs: None,
            history_limit: None,
            max_message_length: None,
            log_level: Some("debug".to_string()),
            data_dir: None,
            safety_settings: Vec::new(),
        };

        let merged = base.merge(&other);
        assert_eq!(merged.api_key.as_deref(), Some("override"));
        assert_eq!(merged.top_k, Some(10));
        assert_eq!(merged.temperature, Some(0.7));
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert_eq!(merged.endpoints, base.endpoints);
    }
}
