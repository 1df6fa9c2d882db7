use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const RELAY_DIR: &str = ".relay";

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip)]
    pub workspace_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            workspace_dir: PathBuf::from("."),
        }
    }
}

pub fn get_relay_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(RELAY_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_relay_dir().join("config.toml")
}

pub fn ensure_relay_dir() -> Result<PathBuf> {
    let relay_dir = get_relay_dir();

    if !relay_dir.exists() {
        std::fs::create_dir_all(&relay_dir).with_context(|| {
            format!("Failed to create relay directory at {}", relay_dir.display())
        })?;
    }

    Ok(relay_dir)
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'relay onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_relay_dir()?;

    let config_path = get_config_path();
    let content = config.to_toml()?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_toml("api_key = \"sk-test\"\n").unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(config.provider.is_none());
    }

    #[test]
    fn toml_round_trip_keeps_settings() {
        let config = Config {
            provider: Some("openai".to_string()),
            api_key: "sk-abc".to_string(),
            base_url: Some("http://localhost:8080/v1".to_string()),
            model: "gpt-4o".to_string(),
            max_tokens: 2048,
            workspace_dir: PathBuf::from("/somewhere"),
        };

        let text = config.to_toml().unwrap();
        assert!(!text.contains("workspace_dir"));

        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.provider.as_deref(), Some("openai"));
        assert_eq!(parsed.model, "gpt-4o");
        assert_eq!(parsed.max_tokens, 2048);
        assert_eq!(parsed.workspace_dir, PathBuf::from("."));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Config::from_toml("max_tokens = \"lots\"").is_err());
    }
}
