//! Configuration module

use serde::Deserialize;

use crate::hgsmart::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub hgsmart: HgSmartSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HgSmartSettings {
    pub username: String,
    /// Account password; omitted when only a persisted refresh token is kept
    #[serde(default)]
    pub password: Option<String>,
    /// Persisted refresh token for passwordless session bootstrap
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Poll interval in minutes
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

fn default_port() -> u16 {
    8082
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_update_interval() -> u64 {
    15
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("HGSMART").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;

        if config.hgsmart.password.is_none() && config.hgsmart.refresh_token.is_none() {
            anyhow::bail!("Either hgsmart.password or hgsmart.refresh_token must be configured");
        }
        if config.hgsmart.update_interval == 0 {
            anyhow::bail!("hgsmart.update_interval must be at least 1 minute");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings: HgSmartSettings = serde_json::from_value(serde_json::json!({
            "username": "user@example.com",
            "password": "secret"
        }))
        .unwrap();

        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.update_interval, 15);
        assert!(settings.refresh_token.is_none());
    }

    #[test]
    fn test_server_defaults() {
        let config: ServerConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config.port, 8082);
    }
}
