// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration persistence for restsql
//!
//! Stores the backend endpoint and API key in a config file. All restsql
//! data is stored under ~/.restsql/:
//! - ~/.restsql/config.json - user configuration
//! - ~/.restsql/history - REPL command history
//!
//! The environment variables RESTSQL_URL and RESTSQL_KEY override the file;
//! command-line flags override both.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the base restsql directory (~/.restsql/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".restsql"))
        .context("Could not determine home directory")
}

/// restsql configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the PostgREST endpoint
    /// (e.g. https://xyz.supabase.co/rest/v1)
    #[serde(default)]
    pub url: Option<String>,
    /// API key, sent as `apikey` and bearer token
    #[serde(default)]
    pub key: Option<String>,
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the config file path (~/.restsql/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }

    /// Layer environment variables over the file values
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var("RESTSQL_URL")
            && !url.is_empty()
        {
            self.url = Some(url);
        }
        if let Ok(key) = std::env::var("RESTSQL_KEY")
            && !key.is_empty()
        {
            self.key = Some(key);
        }
        self
    }

    /// Layer explicit overrides (command-line flags) over everything else
    pub fn apply_overrides(mut self, url: Option<String>, key: Option<String>) -> Self {
        if url.is_some() {
            self.url = url;
        }
        if key.is_some() {
            self.key = key;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.url.is_none());
        assert!(config.key.is_none());
    }

    #[test]
    fn test_config_serialize() {
        let config = Config {
            url: Some("https://xyz.supabase.co/rest/v1".to_string()),
            key: Some("service-role-key".to_string()),
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("url"));
        assert!(json.contains("xyz.supabase.co"));
    }

    #[test]
    fn test_config_deserialize() {
        let json = r#"{"url": "http://localhost:3000", "key": "k"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.key.as_deref(), Some("k"));
    }

    #[test]
    fn test_config_deserialize_empty() {
        let json = "{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.url.is_none());
        assert!(config.key.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let original = Config {
            url: Some("http://localhost:3000".to_string()),
            key: None,
        };
        let json = serde_json::to_string_pretty(&original).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(original.url, parsed.url);
        assert_eq!(original.key, parsed.key);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        // Save config
        let config = Config {
            url: Some("http://localhost:3000".to_string()),
            key: Some("k".to_string()),
        };
        let content = serde_json::to_string_pretty(&config).unwrap();
        fs::write(&config_path, content).unwrap();

        // Load and verify
        let loaded_content = fs::read_to_string(&config_path).unwrap();
        let loaded: Config = serde_json::from_str(&loaded_content).unwrap();
        assert_eq!(loaded.url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(loaded.key.as_deref(), Some("k"));
    }

    #[test]
    fn test_overrides_win() {
        let config = Config {
            url: Some("http://file-value".to_string()),
            key: Some("file-key".to_string()),
        };
        let config = config.apply_overrides(Some("http://flag-value".to_string()), None);
        assert_eq!(config.url.as_deref(), Some("http://flag-value"));
        assert_eq!(config.key.as_deref(), Some("file-key"));
    }
}
