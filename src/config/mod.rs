use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the DSA Recall backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Problems per page on the Due tab.
    #[serde(default = "default_page_size")]
    pub due_page_size: u32,
    /// Problems per page on the All tab.
    #[serde(default = "default_page_size")]
    pub all_page_size: u32,
    /// Months of history shown in the activity heatmap.
    #[serde(default = "default_heatmap_months")]
    pub heatmap_months: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            due_page_size: default_page_size(),
            all_page_size: default_page_size(),
            heatmap_months: default_heatmap_months(),
        }
    }
}

fn default_page_size() -> u32 {
    5
}

fn default_heatmap_months() -> u32 {
    6
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse configuration file")?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dashboard: DashboardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.dashboard.due_page_size == 0 || self.dashboard.all_page_size == 0 {
            anyhow::bail!("Page sizes must be at least 1");
        }
        if self.dashboard.heatmap_months == 0 {
            anyhow::bail!("heatmap_months must be at least 1");
        }
        Ok(())
    }

    /// Default config file location: `~/.config/recall/config.toml`.
    pub fn default_path() -> PathBuf {
        state_dir().join("config.toml")
    }

    /// File the session cookie is persisted to between invocations.
    pub fn session_file() -> PathBuf {
        state_dir().join("session")
    }

    /// Log file used when the interactive UI owns the terminal.
    pub fn log_file() -> PathBuf {
        state_dir().join("recall.log")
    }
}

/// Directory for config and client state, `~/.config/recall` on Linux. Falls
/// back to a dotted directory in the working directory when the platform
/// reports no config dir.
fn state_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("recall"),
        None => PathBuf::from(".recall"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_file() {
        let config = Config::default();
        assert_eq!(config.server.api_url, "http://localhost:8080");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.dashboard.due_page_size, 5);
        assert_eq!(config.dashboard.all_page_size, 5);
        assert_eq!(config.dashboard.heatmap_months, 6);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
api_url = "https://recall.example.com"

[dashboard]
due_page_size = 10
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.api_url, "https://recall.example.com");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.dashboard.due_page_size, 10);
        assert_eq!(config.dashboard.all_page_size, 5);
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.server.api_url, "http://localhost:8080");
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dashboard]\nall_page_size = 0\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml {").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
