use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};

/// Environment variable that overrides `api.api_key`.
pub const API_KEY_ENV: &str = "CWA_API_KEY";

/// Settings for the CWA open-data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Dataset queried for forecasts, e.g. "F-D0047-089" (3-day township forecast).
    pub dataset_id: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opendata.cwa.gov.tw/api/v1".to_string(),
            dataset_id: "F-D0047-089".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://forecast-hub.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [api]
/// api_key = "..."
///
/// [database]
/// url = "sqlite://forecast-hub.db?mode=rwc"
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    /// `CWA_API_KEY` takes precedence over the stored key.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env_override(env::var(API_KEY_ENV).ok());
        Ok(cfg)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "forecast-hub", "forecast-hub")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    fn apply_env_override(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api.api_key = Some(key);
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api.api_key = Some(api_key);
    }

    /// Returns the API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_cwa() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url, "https://opendata.cwa.gov.tw/api/v1");
        assert_eq!(cfg.api.dataset_id, "F-D0047-089");
        assert_eq!(cfg.api.timeout(), Duration::from_secs(10));
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [api]
            api_key = "CWA-KEY"

            [server]
            bind = "0.0.0.0:9000"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.api_key(), Some("CWA-KEY"));
        assert_eq!(cfg.api.dataset_id, "F-D0047-089");
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.database.url, "sqlite://forecast-hub.db?mode=rwc");
    }

    #[test]
    fn env_override_replaces_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());

        cfg.apply_env_override(Some("ENV_KEY".into()));
        assert_eq!(cfg.api_key(), Some("ENV_KEY"));

        cfg.apply_env_override(Some("  ".into()));
        assert_eq!(cfg.api_key(), Some("ENV_KEY"));

        cfg.apply_env_override(None);
        assert_eq!(cfg.api_key(), Some("ENV_KEY"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key("   ".into());
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("forecast-hub-missing/config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn toml_roundtrip_preserves_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.api_key(), Some("KEY"));
    }
}
