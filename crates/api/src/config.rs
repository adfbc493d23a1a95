//! Service Configuration
//!
//! Built-in defaults, then an optional TOML file, then `FRAUD_`-prefixed
//! environment variables with `__` between nested keys
//! (`FRAUD_SERVER__PORT=9000`).

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use data_validator::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default location of the service config file
pub const DEFAULT_CONFIG_PATH: &str = "config/service.toml";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    pub model_info: ModelInfoConfig,
    /// Optional request bounds on top of the always-on checks
    pub validation: ValidationConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Artifact location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory holding the training artifacts
    pub models_dir: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
        }
    }
}

/// Cross-origin policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Log output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    #[default]
    Pretty,
    /// Single-line human readable output
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Values reported by `/model-info` when no training metadata is present
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfoConfig {
    pub gbt_accuracy: String,
    pub oblivious_accuracy: String,
    pub last_updated: String,
}

impl Default for ModelInfoConfig {
    fn default() -> Self {
        Self {
            gbt_accuracy: "98.83%".to_string(),
            oblivious_accuracy: "96.63%".to_string(),
            last_updated: "2025-05-04".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load from `path`, or from the default location when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&ServiceConfig::default())
            .context("Failed to encode default configuration")?;

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let config = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix("FRAUD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8000");
        assert_eq!(config.models.models_dir, PathBuf::from("models"));
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.model_info.gbt_accuracy, "98.83%");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.validation, ValidationConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[cors]
allowed_origins = ["https://dashboard.example.com", "http://localhost:3000"]
"#
        )
        .unwrap();

        let config = ServiceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.cors.allowed_origins.len(), 2);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.validation.amount_range, None);
    }

    #[test]
    fn test_logging_and_validation_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[logging]
format = "compact"

[validation]
amount_range = [0.0, 25000.0]
max_text_length = 128
"#
        )
        .unwrap();

        let config = ServiceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.validation.amount_range, Some((0.0, 25_000.0)));
        assert_eq!(config.validation.max_text_length, Some(128));
        assert_eq!(config.validation.latitude_range, None);
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nformat = \"fancy\"").unwrap();
        assert!(ServiceConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        assert!(ServiceConfig::load(Some(Path::new("/nonexistent/service.toml"))).is_err());
    }
}
