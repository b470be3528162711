use axum::http::HeaderName;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Label stamped on every access record.
    pub category: String,
    pub request_id_header: String,
    /// Take the client address from proxy headers instead of the socket.
    pub trust_forwarded_headers: bool,
}

impl AppConfig {
    /// Loads from `CONFIG_PATH` (default `config/default.yaml`), then
    /// `ACCESS_LOG__*` environment variables, then `HOST` / `PORT`.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.timeout_seconds", 30)?
            .set_default("logging.format", "json")?
            .set_default("logging.category", "http")?
            .set_default("logging.request_id_header", "x-request-id")?
            .set_default("logging.trust_forwarded_headers", false)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("ACCESS_LOG").separator("__"));

        // Override with environment variables if present
        if let Ok(host) = std::env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>()?)?;
        }

        let settings = builder.build()?;
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.category.trim().is_empty() {
            return Err(ConfigError::EmptyCategory);
        }
        self.logging.request_id_header()?;
        Ok(())
    }
}

impl LoggingConfig {
    pub fn request_id_header(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.request_id_header.as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(self.request_id_header.clone()))
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_file(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!(
            "access-logger-{}-{}.yaml",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let config = AppConfig::load_from("does/not/exist.yaml").unwrap();

        assert_eq!(config.server.timeout_seconds, 30);
        assert_eq!(config.logging.category, "http");
        assert_eq!(config.logging.request_id_header, "x-request-id");
        assert!(!config.logging.trust_forwarded_headers);
    }

    #[test]
    fn file_values_override_defaults() {
        let path = config_file(
            "override",
            "logging:\n  category: billing\n  format: pretty\n  trust_forwarded_headers: true\n",
        );

        let config = AppConfig::load_from(&path).unwrap();

        assert_eq!(config.logging.category, "billing");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.trust_forwarded_headers);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn rejects_empty_category() {
        let path = config_file("empty-category", "logging:\n  category: \"  \"\n");

        let err = AppConfig::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::EmptyCategory));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn rejects_invalid_request_id_header() {
        let path = config_file("bad-header", "logging:\n  request_id_header: \"bad header\"\n");

        let err = AppConfig::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidHeaderName(name) if name == "bad header"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn parses_log_format_names() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
