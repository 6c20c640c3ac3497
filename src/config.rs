//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::fetch::FetchConfig;
use crate::library::CORECHART_PACKAGE;
use crate::registry::RegistryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub library: LibrarySettings,

    #[serde(default)]
    pub render: RenderSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data source fetching
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    /// Base url relative sources resolve against
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("datavis/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Charting library
#[derive(Debug, Clone, Deserialize)]
pub struct LibrarySettings {
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_packages() -> Vec<String> {
    vec![CORECHART_PACKAGE.to_string()]
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    400
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            packages: default_packages(),
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Rendering and output
#[derive(Debug, Clone, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Draw each placeholder at most once
    #[serde(default)]
    pub render_once: bool,

    /// Give up waiting for outstanding sources after this many seconds
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout_secs: u64,
}

fn default_output_dir() -> String {
    "./charts".to_string()
}

fn default_settle_timeout() -> u64 {
    120
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            render_once: false,
            settle_timeout_secs: default_settle_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("datavis").join("config.toml")),
            Some(PathBuf::from("/etc/datavis/config.toml")),
            Some(PathBuf::from("./datavis.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = var("DATAVIS_BASE_URL") {
            self.fetch.base_url = Some(base_url);
        }
        if let Some(timeout) = var("DATAVIS_REQUEST_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.fetch.request_timeout_secs = secs;
            }
        }

        if let Some(dir) = var("DATAVIS_OUTPUT_DIR") {
            self.render.output_dir = dir;
        }

        if let Some(level) = var("DATAVIS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("DATAVIS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Settings for the HTTP fetcher
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            base_url: self.fetch.base_url.clone(),
            request_timeout_secs: self.fetch.request_timeout_secs,
            user_agent: self.fetch.user_agent.clone(),
        }
    }

    /// Settings for the chart registry
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            packages: self.library.packages.clone(),
            render_once: self.render.render_once,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Datavis Configuration
#
# Environment variables override these settings:
# - DATAVIS_BASE_URL
# - DATAVIS_REQUEST_TIMEOUT
# - DATAVIS_OUTPUT_DIR
# - DATAVIS_LOG_LEVEL
# - DATAVIS_LOG_FORMAT

[fetch]
# Base url that relative data sources (data-vis-src="/...") resolve against
# base_url = "http://localhost:8000/"

# Per-request timeout in seconds
request_timeout_secs = 30

[library]
# Packages requested from the charting library
packages = ["corechart"]

# Default chart size in pixels (render options may override)
width = 800
height = 400

[render]
# Directory rendered charts are written to
output_dir = "./charts"

# Draw each chart at most once even if readiness is signalled again
render_once = false

# Stop waiting for outstanding data sources after this many seconds
settle_timeout_secs = 120

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.fetch.base_url.is_none());
        assert_eq!(config.fetch.request_timeout_secs, 30);
        assert_eq!(config.library.packages, vec!["corechart"]);
        assert_eq!(config.render.output_dir, "./charts");
        assert!(!config.render.render_once);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.library.width, 800);
        assert_eq!(config.render.settle_timeout_secs, 120);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse(
            r#"
            [fetch]
            base_url = "http://finance.local/"

            [render]
            render_once = true
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.base_url.as_deref(), Some("http://finance.local/"));
        assert_eq!(config.fetch.request_timeout_secs, 30);
        assert!(config.registry_config().render_once);
        assert_eq!(config.registry_config().packages, vec!["corechart"]);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DATAVIS_BASE_URL", "http://127.0.0.1:8000/"),
            ("DATAVIS_REQUEST_TIMEOUT", "5"),
            ("DATAVIS_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        let fetch = config.fetch_config();
        assert_eq!(fetch.base_url.as_deref(), Some("http://127.0.0.1:8000/"));
        assert_eq!(fetch.request_timeout_secs, 5);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[render\nrender_once = yes").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }
}
