use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::chatbot::openai::DEFAULT_BASE_URL;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse JSON.
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Falls back to TELEGRAM_BOT_TOKEN when empty.
    #[serde(default)]
    telegram_bot_token: String,
    /// Falls back to OPENAI_API_KEY when empty.
    #[serde(default)]
    openai_api_key: String,
    openai_base_url: Option<String>,
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
    #[serde(default = "default_webhook_path")]
    webhook_path: String,
    /// Public URL Telegram should deliver updates to.
    webhook_url: Option<String>,
    resources_dir: Option<String>,
    /// Directory for logs. Defaults to current directory.
    data_dir: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_webhook_path() -> String {
    "/api/webhook".to_string()
}

pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub listen_addr: SocketAddr,
    pub webhook_path: String,
    pub webhook_url: Option<String>,
    pub resources_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load with a custom environment lookup for the secret fallbacks.
    pub fn load_with_env<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile {
                path: config_path.clone(),
                source: e,
            })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson {
                path: config_path.clone(),
                source: e,
            })?;

        let telegram_bot_token = or_env(file.telegram_bot_token, "TELEGRAM_BOT_TOKEN", &env);
        let openai_api_key = or_env(file.openai_api_key, "OPENAI_API_KEY", &env);

        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if openai_api_key.is_empty() {
            return Err(ConfigError::Validation("openai_api_key is required".into()));
        }

        let listen_addr = file.listen_addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Validation(format!("listen_addr '{}' is invalid: {}", file.listen_addr, e))
        })?;
        if !file.webhook_path.starts_with('/') {
            return Err(ConfigError::Validation("webhook_path must start with '/'".into()));
        }

        Ok(Self {
            telegram_bot_token,
            openai_api_key,
            openai_base_url: file.openai_base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            listen_addr,
            webhook_path: file.webhook_path,
            webhook_url: file.webhook_url,
            resources_dir: file.resources_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("resources")),
            data_dir: file.data_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn or_env(value: String, key: &str, env: &impl Fn(&str) -> Option<String>) -> String {
    let value = value.trim().to_string();
    if value.is_empty() {
        env(key).map(|v| v.trim().to_string()).unwrap_or_default()
    } else {
        value
    }
}
