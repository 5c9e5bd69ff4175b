//! Process environment: runtime mode and App Engine identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wonder_stuff_core::{ErrorKind, KindError};

/// Environment variable selecting the runtime mode.
pub const RUNTIME_MODE_VAR: &str = "NODE_ENV";

/// Value used for App Engine identity fields that are not set.
pub const UNKNOWN: &str = "unknown";

/// How the process is being run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Test,
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    /// The mode named by `NODE_ENV`, defaulting to development when it is
    /// unset or unrecognised.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(RUNTIME_MODE_VAR).ok().as_deref())
    }

    #[must_use]
    pub fn from_value(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeMode {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Self::Test),
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(KindError::new(
                format!("Unrecognised runtime mode: {other:?}"),
                ErrorKind::INVALID_INPUT,
            )),
        }
    }
}

/// Identity of the App Engine instance the process runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppEngineInfo {
    pub service: String,
    pub version: String,
    pub instance: String,
}

impl Default for AppEngineInfo {
    fn default() -> Self {
        Self {
            service: UNKNOWN.to_owned(),
            version: UNKNOWN.to_owned(),
            instance: UNKNOWN.to_owned(),
        }
    }
}

impl AppEngineInfo {
    /// Read `GAE_SERVICE`, `GAE_VERSION` and `GAE_INSTANCE`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_owned())
        };
        Self {
            service: read("GAE_SERVICE"),
            version: read("GAE_VERSION"),
            instance: read("GAE_INSTANCE"),
        }
    }

    /// Whether any identity field was provided.
    #[must_use]
    pub fn is_app_engine(&self) -> bool {
        [&self.service, &self.version, &self.instance]
            .iter()
            .any(|value| value.as_str() != UNKNOWN)
    }
}
