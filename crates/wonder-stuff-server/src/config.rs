//! Service configuration.
//!
//! Values come from defaults, then `wonder.toml`, then an explicit file,
//! then `WONDER_`-prefixed environment variables.

use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use thiserror::Error;

use crate::logger::LogLevel;
use crate::options::ServerOptions;
use crate::runtime::{AppEngineInfo, RuntimeMode};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("Configuration error: {0}")]
    Parse(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ServerConfig {
    /// Load configuration from file and environment.
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. `wonder.toml` in the current directory (if present)
    /// 3. The given file (if provided)
    /// 4. Environment variables with the `WONDER_` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Toml::file("wonder.toml"));

        if let Some(p) = path {
            figment = figment.merge(Toml::file(p));
        }

        let config: Self = figment
            .merge(Env::prefixed("WONDER_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::Invalid("server.name must not be empty".into()));
        }
        if self.server.keep_alive_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.keep_alive_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Resolve into start-up options for the given runtime mode.
    #[must_use]
    pub fn server_options(&self, mode: RuntimeMode) -> ServerOptions {
        let mut options = ServerOptions::new(self.server.name.clone())
            .with_host(self.server.host.clone())
            .with_port(self.server.port)
            .with_keep_alive_timeout(Duration::from_millis(self.server.keep_alive_timeout_ms))
            .with_request_logging(self.server.request_logging)
            .with_mode(mode);
        options.app_engine = AppEngineInfo::from_env();
        options
    }
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Service name used for the root logger and start-up messages.
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Idle keep-alive timeout in milliseconds.
    #[serde(default = "default_keep_alive_timeout_ms")]
    pub keep_alive_timeout_ms: u64,

    /// Whether to log each completed request.
    #[serde(default = "default_true")]
    pub request_logging: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
            keep_alive_timeout_ms: default_keep_alive_timeout_ms(),
            request_logging: true,
        }
    }
}

fn default_name() -> String {
    "wonder-stuff-server".to_owned()
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_keep_alive_timeout_ms() -> u64 {
    90_000
}

const fn default_true() -> bool {
    true
}

/// Logging settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.keep_alive_timeout_ms, 90_000);
        assert!(config.server.request_logging);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nname = \"render\"\nport = 9090\nkeep_alive_timeout_ms = 1000\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = ServerConfig::load(file.path().to_str()).unwrap();

        assert_eq!(config.server.name, "render");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.level, LogLevel::Debug);

        let options = config.server_options(RuntimeMode::Production);
        assert_eq!(options.keep_alive_timeout, Duration::from_secs(1));
        assert_eq!(options.headers_timeout(), Duration::from_secs(6));
        assert_eq!(options.mode, RuntimeMode::Production);
    }

    #[test]
    fn zero_keep_alive_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nkeep_alive_timeout_ms = 0").unwrap();

        let err = ServerConfig::load(file.path().to_str()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
