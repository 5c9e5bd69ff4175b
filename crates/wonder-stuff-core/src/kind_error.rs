//! Categorised errors with an optional cause.
//!
//! A [`KindError`] carries a [`ErrorKind`], frozen [`Metadata`] and an
//! optional [`ErrorCause`]. When a cause is attached the message is
//! rewritten to describe the causation, so the outermost error's message
//! reads as the whole story:
//!
//! ```text
//! Could not load profile
//! 	caused by
//! 		NotFoundError: no such user
//! ```
//!
//! Causes are owned and moved in on construction, so an error can never be
//! its own cause and a chain of causes can never loop back on itself.

use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::error_info::ErrorInfo;
use crate::kind::{contains_whitespace, ErrorKind};
use crate::metadata::Metadata;
use crate::text::first_non_blank_line;

/// Raised when a [`KindError`] is constructed with unusable parts.
///
/// This is deliberately not a `KindError`: it reports programmer mistakes
/// in building one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    #[error("kind must be non-empty and contain no whitespace: {0:?}")]
    InvalidKind(String),

    #[error("prefix must not contain whitespace: {0:?}")]
    InvalidPrefix(String),

    #[error("name must not contain whitespace: {0:?}")]
    InvalidName(String),
}

/// Any error that did not come from this crate, reduced to a name and a
/// message. Opaque errors end a cause chain.
#[derive(Debug, Clone)]
pub struct OpaqueError {
    name: String,
    message: String,
    error: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl OpaqueError {
    /// An opaque error with an explicit name and message.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            error: None,
        }
    }

    /// Capture a foreign error. The name is the error's type name without
    /// its module path.
    #[must_use]
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            name: short_type_name(std::any::type_name::<E>()).to_owned(),
            message: error.to_string(),
            error: Some(Arc::new(error)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for OpaqueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl StdError for OpaqueError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.as_deref().and_then(|error| error.source())
    }
}

/// The cause of a [`KindError`].
#[derive(Debug, Clone)]
pub enum ErrorCause {
    /// A structured error whose own cause is part of the chain.
    Kind(KindError),
    /// Any other error; the chain stops here.
    Opaque(OpaqueError),
}

impl ErrorCause {
    /// Wrap a foreign error.
    #[must_use]
    pub fn opaque<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Opaque(OpaqueError::from_error(error))
    }

    #[must_use]
    pub fn as_error_ref(&self) -> ErrorRef<'_> {
        match self {
            Self::Kind(error) => ErrorRef::Kind(error),
            Self::Opaque(error) => ErrorRef::Opaque(error),
        }
    }
}

impl From<KindError> for ErrorCause {
    fn from(error: KindError) -> Self {
        Self::Kind(error)
    }
}

impl From<OpaqueError> for ErrorCause {
    fn from(error: OpaqueError) -> Self {
        Self::Opaque(error)
    }
}

/// A borrowed view of either kind of error in a chain.
#[derive(Debug, Clone, Copy)]
pub enum ErrorRef<'a> {
    /// A [`KindError`].
    Kind(&'a KindError),
    /// An [`OpaqueError`].
    Opaque(&'a OpaqueError),
}

impl<'a> ErrorRef<'a> {
    /// The error's name, e.g. `NotFoundError`.
    #[must_use]
    pub fn name(&self) -> &'a str {
        match *self {
            Self::Kind(error) => error.name(),
            Self::Opaque(error) => error.name(),
        }
    }

    /// The full message, including any caused-by description.
    #[must_use]
    pub fn message(&self) -> &'a str {
        match *self {
            Self::Kind(error) => error.message(),
            Self::Opaque(error) => error.message(),
        }
    }

    /// The kind, for structured errors.
    #[must_use]
    pub fn kind(&self) -> Option<&'a ErrorKind> {
        self.as_kind_error().map(KindError::kind)
    }

    /// The structured error, unless this is an opaque one.
    #[must_use]
    pub fn as_kind_error(&self) -> Option<&'a KindError> {
        match *self {
            Self::Kind(error) => Some(error),
            Self::Opaque(_) => None,
        }
    }

    /// The next error in the chain. Opaque errors have none.
    #[must_use]
    pub fn cause(&self) -> Option<ErrorRef<'a>> {
        self.as_kind_error()
            .and_then(KindError::cause)
            .map(ErrorCause::as_error_ref)
    }

    /// Where a structured error was constructed.
    #[must_use]
    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.as_kind_error().map(KindError::location)
    }
}

impl fmt::Display for ErrorRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(error) => fmt::Display::fmt(error, f),
            Self::Opaque(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl<'a> From<&'a KindError> for ErrorRef<'a> {
    fn from(error: &'a KindError) -> Self {
        Self::Kind(error)
    }
}

impl<'a> From<&'a OpaqueError> for ErrorRef<'a> {
    fn from(error: &'a OpaqueError) -> Self {
        Self::Opaque(error)
    }
}

impl<'a> From<&'a ErrorCause> for ErrorRef<'a> {
    fn from(cause: &'a ErrorCause) -> Self {
        cause.as_error_ref()
    }
}

#[derive(Debug, Clone)]
struct Inner {
    message: String,
    original_message: String,
    kind: ErrorKind,
    name: String,
    metadata: Metadata,
    cause: Option<ErrorCause>,
    location: &'static Location<'static>,
}

/// An error with a kind, metadata and an optional cause.
#[derive(Debug, Clone)]
pub struct KindError {
    inner: Box<Inner>,
}

impl KindError {
    /// A kind error with no cause or metadata.
    #[must_use]
    #[track_caller]
    pub fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self::builder(message, kind).build()
    }

    /// A kind error describing `cause`.
    #[must_use]
    #[track_caller]
    pub fn caused_by(
        message: impl Into<String>,
        kind: ErrorKind,
        cause: impl Into<ErrorCause>,
    ) -> Self {
        Self::builder(message, kind).cause(cause).build()
    }

    /// Start building a kind error.
    #[must_use]
    pub fn builder(message: impl Into<String>, kind: ErrorKind) -> KindErrorBuilder {
        KindErrorBuilder {
            message: message.into(),
            kind,
            prefix: None,
            name: None,
            metadata: Metadata::default(),
            cause: None,
        }
    }

    /// The message, including the caused-by description when there is a
    /// cause.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// The message as given on construction.
    #[must_use]
    pub fn original_message(&self) -> &str {
        &self.inner.original_message
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.inner.kind
    }

    /// `{prefix}{kind}{name}Error`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.inner.metadata
    }

    #[must_use]
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.inner.cause.as_ref()
    }

    /// Where the error was constructed.
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.inner.location
    }

    #[must_use]
    pub fn as_error_ref(&self) -> ErrorRef<'_> {
        ErrorRef::Kind(self)
    }
}

impl fmt::Display for KindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.name, self.inner.message)
    }
}

impl StdError for KindError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.inner.cause.as_ref()? {
            ErrorCause::Kind(error) => Some(error),
            ErrorCause::Opaque(error) => Some(error),
        }
    }
}

/// Builder for [`KindError`].
#[derive(Debug)]
#[must_use]
pub struct KindErrorBuilder {
    message: String,
    kind: ErrorKind,
    prefix: Option<String>,
    name: Option<String>,
    metadata: Metadata,
    cause: Option<ErrorCause>,
}

impl KindErrorBuilder {
    /// Text placed before the kind in the error name.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Text placed between the kind and `Error` in the error name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn metadata(mut self, metadata: impl Into<Metadata>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach a foreign error as the cause.
    pub fn opaque_cause<E>(self, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause(ErrorCause::opaque(error))
    }

    /// Check the parts and build the error.
    #[track_caller]
    pub fn try_build(self) -> Result<KindError, ConstructionError> {
        self.validate()?;
        Ok(self.assemble(Location::caller()))
    }

    /// Build the error.
    ///
    /// # Panics
    ///
    /// In debug builds, if the kind, prefix or name contain whitespace.
    /// Release builds skip the check.
    #[track_caller]
    #[must_use]
    pub fn build(self) -> KindError {
        #[cfg(debug_assertions)]
        if let Err(e) = self.validate() {
            panic!("invalid KindError: {e}");
        }
        self.assemble(Location::caller())
    }

    fn validate(&self) -> Result<(), ConstructionError> {
        if !self.kind.is_valid() {
            return Err(ConstructionError::InvalidKind(self.kind.to_string()));
        }
        if let Some(prefix) = self.prefix.as_deref().filter(|p| contains_whitespace(p)) {
            return Err(ConstructionError::InvalidPrefix(prefix.to_owned()));
        }
        if let Some(name) = self.name.as_deref().filter(|n| contains_whitespace(n)) {
            return Err(ConstructionError::InvalidName(name.to_owned()));
        }
        Ok(())
    }

    fn assemble(self, location: &'static Location<'static>) -> KindError {
        let name = format!(
            "{}{}{}Error",
            self.prefix.as_deref().unwrap_or_default(),
            self.kind,
            self.name.as_deref().unwrap_or_default(),
        );

        let message = match &self.cause {
            Some(cause) => {
                let consequence =
                    ErrorInfo::new(name.clone(), first_non_blank_line(&self.message));
                let cause = ErrorInfo::from_error(cause.as_error_ref());
                ErrorInfo::from_consequence_and_cause(&consequence, &cause)
                    .message()
                    .to_owned()
            }
            None => self.message.clone(),
        };

        KindError {
            inner: Box::new(Inner {
                message,
                original_message: self.message,
                kind: self.kind,
                name,
                metadata: self.metadata,
                cause: self.cause,
                location,
            }),
        }
    }
}

/// `std::io::error::Error` -> `Error`, `my::Thing<u8>` -> `Thing`.
fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
