//! Structured logging.
//!
//! A [`Logger`] carries a name and a set of fields that are attached to
//! every entry it emits through `tracing`. One root logger exists per
//! process; request handlers get a child of it scoped to their request.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use axum::extract::FromRequestParts;
use http::request::Parts;
use http::Extensions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;
use wonder_stuff_core::{errors_from_error, ErrorKind, ErrorOrder, KindError};

use crate::middleware::HandlerError;
use crate::runtime::RuntimeMode;

/// Field holding the error kind of an entry.
pub const KIND_FIELD: &str = "kind";

/// Severity of a log entry, most severe first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    /// Finer than debug. Emitted at `trace`.
    Silly,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Silly => "silly",
        }
    }

    /// The `tracing` filter directive for this level.
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Silly => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "silly" | "trace" => Ok(Self::Silly),
            other => Err(KindError::new(
                format!("Unrecognised log level: {other:?}"),
                ErrorKind::INVALID_INPUT,
            )),
        }
    }
}

/// A prepared log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Name of the logger that produced the entry.
    pub logger: String,

    /// Severity.
    pub level: LogLevel,

    /// Human-readable message.
    pub message: String,

    /// Inherited fields merged with the call's own; the call wins.
    pub fields: Map<String, Value>,
}

impl LogEntry {
    /// The error kind recorded on the entry, if any.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.fields.get(KIND_FIELD).and_then(Value::as_str)
    }
}

#[derive(Debug)]
struct LoggerInner {
    name: String,
    fields: Map<String, Value>,
}

/// Named logger with inherited fields. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                name: name.into(),
                fields: Map::new(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.inner.fields
    }

    /// A logger with the same name whose entries also carry `fields`.
    /// Fields given here override inherited ones.
    #[must_use]
    pub fn child(&self, fields: Map<String, Value>) -> Self {
        let mut merged = self.inner.fields.clone();
        merged.extend(fields);
        Self {
            inner: Arc::new(LoggerInner {
                name: self.inner.name.clone(),
                fields: merged,
            }),
        }
    }

    /// Merge fields into an entry. Error entries without a kind are
    /// marked internal.
    #[must_use]
    pub fn prepare(&self, level: LogLevel, message: &str, fields: Map<String, Value>) -> LogEntry {
        let mut merged = self.inner.fields.clone();
        merged.extend(fields);
        if level == LogLevel::Error && !merged.contains_key(KIND_FIELD) {
            merged.insert(
                KIND_FIELD.to_owned(),
                Value::String(ErrorKind::INTERNAL.as_str().to_owned()),
            );
        }
        LogEntry {
            logger: self.inner.name.clone(),
            level,
            message: message.to_owned(),
            fields: merged,
        }
    }

    pub fn log(&self, level: LogLevel, message: &str, fields: Map<String, Value>) {
        emit(&self.prepare(level, message, fields));
    }

    pub fn error(&self, message: &str, fields: Map<String, Value>) {
        self.log(LogLevel::Error, message, fields);
    }

    pub fn warn(&self, message: &str, fields: Map<String, Value>) {
        self.log(LogLevel::Warn, message, fields);
    }

    pub fn info(&self, message: &str, fields: Map<String, Value>) {
        self.log(LogLevel::Info, message, fields);
    }

    pub fn debug(&self, message: &str, fields: Map<String, Value>) {
        self.log(LogLevel::Debug, message, fields);
    }

    pub fn silly(&self, message: &str, fields: Map<String, Value>) {
        self.log(LogLevel::Silly, message, fields);
    }

    /// Log `error` at error level with its kind and cause chain.
    pub fn log_error(&self, message: &str, error: &KindError) {
        self.error(message, extract_error(error));
    }
}

fn emit(entry: &LogEntry) {
    let logger = entry.logger.as_str();
    let kind = entry.kind().unwrap_or_default();
    let fields = Value::Object(entry.fields.clone());
    let message = entry.message.as_str();

    match entry.level {
        LogLevel::Error => tracing::error!(logger, kind, fields = %fields, "{message}"),
        LogLevel::Warn => tracing::warn!(logger, kind, fields = %fields, "{message}"),
        LogLevel::Info => tracing::info!(logger, fields = %fields, "{message}"),
        LogLevel::Debug => tracing::debug!(logger, fields = %fields, "{message}"),
        LogLevel::Silly => tracing::trace!(logger, fields = %fields, "{message}"),
    }
}

/// Fields describing `error` for a log entry: its kind, name, message,
/// metadata and the names of everything in its cause chain.
#[must_use]
pub fn extract_error(error: &KindError) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(KIND_FIELD.into(), Value::String(error.kind().to_string()));
    fields.insert("error_name".into(), Value::String(error.name().to_owned()));
    fields.insert("error".into(), Value::String(error.message().to_owned()));
    fields.insert(
        "location".into(),
        Value::String(error.location().to_string()),
    );
    if !error.metadata().is_empty() {
        fields.insert("metadata".into(), error.metadata().to_map().into());
    }
    let causes: Vec<Value> =
        errors_from_error(Some(error.as_error_ref()), ErrorOrder::ConsequenceFirst)
            .skip(1)
            .map(|cause| Value::String(cause.to_string()))
            .collect();
    if !causes.is_empty() {
        fields.insert("causes".into(), Value::Array(causes));
    }
    fields
}

static ROOT_LOGGER: OnceLock<Logger> = OnceLock::new();

/// Install the process root logger. Fails with an internal error if one
/// is already set.
pub fn set_root_logger(logger: Logger) -> Result<(), KindError> {
    ROOT_LOGGER.set(logger).map_err(|rejected| {
        KindError::builder("Root logger already set", ErrorKind::INTERNAL)
            .metadata(
                [("rejected".to_owned(), Value::String(rejected.name().to_owned()))]
                    .into_iter()
                    .collect::<Map<_, _>>(),
            )
            .build()
    })
}

/// The root logger, if one has been set.
#[must_use]
pub fn get_root_logger() -> Option<Logger> {
    ROOT_LOGGER.get().cloned()
}

/// The existing root logger, or a new one named `name` installed as root.
pub(crate) fn root_logger_or_init(name: &str) -> Logger {
    ROOT_LOGGER.get_or_init(|| Logger::new(name)).clone()
}

/// The request-scoped logger from `extensions` if present, otherwise the
/// root logger.
pub fn get_logger(extensions: Option<&Extensions>) -> Result<Logger, KindError> {
    if let Some(RequestLogger(logger)) = extensions.and_then(Extensions::get::<RequestLogger>) {
        return Ok(logger.clone());
    }
    get_root_logger()
        .ok_or_else(|| KindError::new("No logger available", ErrorKind::INTERNAL))
}

/// Request-scoped logger. Inserted into request extensions by
/// [`RequestLoggingLayer`](crate::middleware::RequestLoggingLayer) and usable
/// as a handler argument.
#[derive(Debug, Clone)]
pub struct RequestLogger(pub Logger);

impl<S> FromRequestParts<S> for RequestLogger
where
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        get_logger(Some(&parts.extensions))
            .map(Self)
            .map_err(HandlerError::from)
    }
}

/// Install the global `tracing` subscriber. JSON in production, compact
/// text otherwise. `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(mode: RuntimeMode, level: LogLevel) -> Result<(), KindError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match mode {
        RuntimeMode::Production => builder.json().flatten_event(true).try_init(),
        RuntimeMode::Test => builder.with_test_writer().try_init(),
        RuntimeMode::Development => builder.compact().try_init(),
    };

    result.map_err(|e| {
        KindError::new(
            format!("Failed to initialise logging: {e}"),
            ErrorKind::INTERNAL,
        )
    })
}

/// Initialise logging and return a root logger named `name`.
///
/// The subscriber may already be installed (tests, embedding); that is not
/// an error here.
#[must_use]
pub fn create_logger(name: &str, mode: RuntimeMode, level: LogLevel) -> Logger {
    if let Err(e) = init_tracing(mode, level) {
        tracing::debug!(error = %e, "Subscriber already installed");
    }
    root_logger_or_init(name)
}

/// Convenience for building field maps.
#[macro_export]
macro_rules! fields {
    () => { ::serde_json::Map::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::serde_json::Map::new();
        $( map.insert(::std::string::String::from($key), ::serde_json::json!($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("error", LogLevel::Error)]
    #[case("WARN", LogLevel::Warn)]
    #[case("info", LogLevel::Info)]
    #[case("debug", LogLevel::Debug)]
    #[case("silly", LogLevel::Silly)]
    #[case("trace", LogLevel::Silly)]
    fn parse_levels(#[case] input: &str, #[case] expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>().unwrap(), expected);
    }

    #[test]
    fn silly_maps_to_trace() {
        assert_eq!(LogLevel::Silly.directive(), "trace");
        assert!(LogLevel::Silly > LogLevel::Debug);
    }

    #[test]
    fn error_entries_default_to_internal_kind() {
        let logger = Logger::new("svc");

        let entry = logger.prepare(LogLevel::Error, "boom", Map::new());
        assert_eq!(entry.kind(), Some("Internal"));

        let entry = logger.prepare(LogLevel::Error, "boom", fields! { "kind" => "NotFound" });
        assert_eq!(entry.kind(), Some("NotFound"));

        let entry = logger.prepare(LogLevel::Warn, "careful", Map::new());
        assert_eq!(entry.kind(), None);
    }

    #[test]
    fn child_fields_are_inherited_and_overridable() {
        let parent = Logger::new("svc").child(fields! { "a" => 1, "b" => 2 });
        let child = parent.child(fields! { "b" => 3 });

        let entry = child.prepare(LogLevel::Info, "hi", fields! { "c" => 4 });

        assert_eq!(entry.logger, "svc");
        assert_eq!(Value::Object(entry.fields), json!({"a": 1, "b": 3, "c": 4}));
        assert_eq!(parent.fields()["b"], json!(2));
    }

    #[test]
    fn extract_error_lists_causes() {
        let root = KindError::new("disk full", ErrorKind::INTERNAL);
        let error = KindError::caused_by("save failed", ErrorKind::INVALID_USE, root);

        let fields = extract_error(&error);

        assert_eq!(fields["kind"], json!("InvalidUse"));
        assert_eq!(fields["error_name"], json!("InvalidUseError"));
        assert_eq!(fields["causes"], json!(["InternalError: disk full"]));
        assert!(!fields.contains_key("metadata"));
    }

    #[test]
    fn request_logger_is_preferred() {
        let mut extensions = Extensions::new();
        extensions.insert(RequestLogger(Logger::new("request")));

        let logger = get_logger(Some(&extensions)).unwrap();
        assert_eq!(logger.name(), "request");
    }
}
