//! Name and message pairs extracted from errors.

use std::fmt;

use crate::kind_error::ErrorRef;
use crate::text::{build_caused_by_message, first_non_blank_line};

/// The name and message of an error, detached from the error itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    name: String,
    message: String,
}

impl ErrorInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The error's name and full message.
    #[must_use]
    pub fn from_error(error: ErrorRef<'_>) -> Self {
        Self::new(error.name(), error.message())
    }

    /// The error's name and the first non-blank line of its message.
    ///
    /// Use this for an error whose message may already describe a cause,
    /// so only its own headline is kept.
    #[must_use]
    pub fn normalize(error: ErrorRef<'_>) -> Self {
        Self::new(error.name(), first_non_blank_line(error.message()))
    }

    /// Describe `consequence` as caused by `cause`. The result keeps the
    /// consequence's name.
    #[must_use]
    pub fn from_consequence_and_cause(consequence: &Self, cause: &Self) -> Self {
        Self::new(
            consequence.name.clone(),
            build_caused_by_message(&consequence.message, &cause.message_with_name()),
        )
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `"{name}: {message}"`.
    #[must_use]
    pub fn message_with_name(&self) -> String {
        format!("{}: {}", self.name, self.message)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}
