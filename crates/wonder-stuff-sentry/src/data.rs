//! Sentry data carried by errors.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wonder_stuff_core::{ErrorCause, ErrorKind, ErrorRef, KindError, Metadata};

use crate::normalize::normalize_sentry_data;
use crate::options::{kind_error_data_options, KindErrorDataOptions};

/// Metadata key under which a [`KindSentryError`] keeps its Sentry data.
pub const SENTRY_METADATA_KEY: &str = "sentry";

/// A named Sentry context: arbitrary JSON properties.
pub type SentryContext = Map<String, Value>;

/// Tags, contexts and fingerprint to attach to a reported event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentryData {
    /// Short indexed key/value pairs used for search.
    pub tags: BTreeMap<String, String>,

    /// Named records shown as their own sections in the event.
    pub contexts: BTreeMap<String, SentryContext>,

    /// Grouping key parts. Order matters.
    pub fingerprint: Vec<String>,
}

impl SentryData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, name: impl Into<String>, context: SentryContext) -> Self {
        self.contexts.insert(name.into(), context);
        self
    }

    #[must_use]
    pub fn with_fingerprint<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fingerprint.extend(parts.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.contexts.is_empty() && self.fingerprint.is_empty()
    }
}

/// The Sentry data stored on `error`, or empty data if it has none.
///
/// Validated against the process-wide options; see
/// [`sentry_data_with_options`].
#[must_use]
pub fn sentry_data_of(error: ErrorRef<'_>) -> SentryData {
    sentry_data_with_options(error, kind_error_data_options())
}

/// The Sentry data stored on `error`, validated against `options`.
///
/// Any kind error can carry a `sentry` metadata entry, not only those built
/// through [`KindSentryError`], so what is read is normalised again.
/// Opaque errors, malformed data and data that fails validation all yield
/// empty data.
#[must_use]
pub fn sentry_data_with_options(
    error: ErrorRef<'_>,
    options: &KindErrorDataOptions,
) -> SentryData {
    let Some(value) = error
        .as_kind_error()
        .and_then(|e| e.metadata().get(SENTRY_METADATA_KEY))
    else {
        return SentryData::default();
    };

    let data = match serde_json::from_value(value.clone()) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(error = %e, name = error.name(), "Ignoring malformed sentry data");
            return SentryData::default();
        }
    };

    match normalize_sentry_data(data, options) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(error = %e, name = error.name(), "Ignoring invalid sentry data");
            SentryData::default()
        }
    }
}

/// A [`KindError`] carrying Sentry data in its metadata.
#[derive(Debug, Clone)]
pub struct KindSentryError(KindError);

impl KindSentryError {
    /// Start building an error.
    pub fn builder(message: impl Into<String>, kind: ErrorKind) -> KindSentryErrorBuilder {
        KindSentryErrorBuilder {
            message: message.into(),
            kind,
            prefix: None,
            name: None,
            metadata: Map::new(),
            cause: None,
            sentry_data: SentryData::default(),
        }
    }

    /// The normalised Sentry data attached to this error.
    #[must_use]
    pub fn sentry_data(&self) -> SentryData {
        sentry_data_of(self.0.as_error_ref())
    }

    #[must_use]
    pub fn as_kind_error(&self) -> &KindError {
        &self.0
    }

    #[must_use]
    pub fn into_kind_error(self) -> KindError {
        self.0
    }

    #[must_use]
    pub fn as_error_ref(&self) -> ErrorRef<'_> {
        self.0.as_error_ref()
    }
}

impl std::ops::Deref for KindSentryError {
    type Target = KindError;

    fn deref(&self) -> &KindError {
        &self.0
    }
}

impl fmt::Display for KindSentryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for KindSentryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<KindSentryError> for KindError {
    fn from(error: KindSentryError) -> Self {
        error.0
    }
}

impl From<KindSentryError> for ErrorCause {
    fn from(error: KindSentryError) -> Self {
        Self::Kind(error.0)
    }
}

/// Builder for [`KindSentryError`].
#[derive(Debug)]
#[must_use]
pub struct KindSentryErrorBuilder {
    message: String,
    kind: ErrorKind,
    prefix: Option<String>,
    name: Option<String>,
    metadata: Map<String, Value>,
    cause: Option<ErrorCause>,
    sentry_data: SentryData,
}

impl KindSentryErrorBuilder {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Metadata besides the Sentry data. A `sentry` key is overwritten.
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn sentry_data(mut self, data: SentryData) -> Self {
        self.sentry_data = data;
        self
    }

    /// Build the error using the process-wide options.
    ///
    /// Fails with an `InvalidInput` error describing the problems if the
    /// Sentry data uses invalid or reserved names, or if the kind, prefix or
    /// name contain whitespace.
    #[track_caller]
    pub fn build(self) -> Result<KindSentryError, KindSentryError> {
        self.build_with_options(kind_error_data_options())
    }

    /// Build the error validating against `options`.
    #[track_caller]
    pub fn build_with_options(
        self,
        options: &KindErrorDataOptions,
    ) -> Result<KindSentryError, KindSentryError> {
        let data = normalize_sentry_data(self.sentry_data, options)?;

        let mut metadata = self.metadata;
        match serde_json::to_value(&data) {
            Ok(value) => {
                metadata.insert(SENTRY_METADATA_KEY.to_owned(), value);
            }
            Err(e) => {
                return Err(KindSentryError(KindError::new(
                    format!("Could not store sentry data: {e}"),
                    ErrorKind::INTERNAL,
                )));
            }
        }

        let mut builder =
            KindError::builder(self.message, self.kind).metadata(Metadata::new(metadata));
        if let Some(prefix) = self.prefix {
            builder = builder.prefix(prefix);
        }
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        if let Some(cause) = self.cause {
            builder = builder.cause(cause);
        }
        builder.try_build().map(KindSentryError).map_err(|e| {
            KindSentryError(
                KindError::builder("Could not build sentry error", ErrorKind::INVALID_INPUT)
                    .opaque_cause(e)
                    .build(),
            )
        })
    }
}

/// Wrap `data` in an error without validating it. Used for errors the
/// crate raises about invalid data, which must not fail themselves.
#[track_caller]
pub(crate) fn unchecked_sentry_error(
    message: &str,
    kind: ErrorKind,
    data: &SentryData,
) -> KindSentryError {
    let mut metadata = Map::new();
    if let Ok(value) = serde_json::to_value(data) {
        metadata.insert(SENTRY_METADATA_KEY.to_owned(), value);
    }
    KindSentryError(
        KindError::builder(message, kind)
            .metadata(Metadata::new(metadata))
            .build(),
    )
}
