// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Turath

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Identity service settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Model server and decision policy settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Document store settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// File transfer settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Web API settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_auth_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_url")]
    pub url: String,
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// Minimum top-1 probability (exclusive) for a recognition
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Versioned label table; the built-in table is used when unset
    #[serde(default)]
    pub labels_path: Option<String>,
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_users_collection")]
    pub users_collection: String,
    #[serde(default = "default_heritage_collection")]
    pub heritage_collection: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub directory: String,
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_auth_url() -> String { "https://identitytoolkit.googleapis.com/v1".to_string() }
fn default_auth_timeout() -> u64 { 30 }
fn default_model_url() -> String { "http://localhost:8501".to_string() }
fn default_model_name() -> String { "heritage".to_string() }
fn default_input_size() -> u32 { 224 }
fn default_threshold() -> f32 { 0.5 }
fn default_model_timeout() -> u64 { 60 }
fn default_retries() -> u32 { 3 }
fn default_db_path() -> String { "turath.db".to_string() }
fn default_users_collection() -> String { "users".to_string() }
fn default_heritage_collection() -> String { "model".to_string() }
fn default_download_dir() -> String { "downloads".to_string() }
fn default_download_timeout() -> u64 { 300 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: default_auth_url(),
            api_key: String::new(),
            timeout_secs: default_auth_timeout(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: default_model_url(),
            name: default_model_name(),
            input_size: default_input_size(),
            threshold: default_threshold(),
            labels_path: None,
            timeout_secs: default_model_timeout(),
            retries: default_retries(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            users_collection: default_users_collection(),
            heritage_collection: default_heritage_collection(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
            timeout_secs: default_download_timeout(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::TurathError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..1.0).contains(&self.model.threshold) {
            return Err(crate::TurathError::Config(format!(
                "model.threshold must be in [0, 1), got {}",
                self.model.threshold
            )));
        }
        if self.model.input_size == 0 {
            return Err(crate::TurathError::Config("model.input_size must be positive".to_string()));
        }
        if self.database.users_collection.is_empty() || self.database.heritage_collection.is_empty() {
            return Err(crate::TurathError::Config("collection names must not be empty".to_string()));
        }
        Ok(())
    }
}
