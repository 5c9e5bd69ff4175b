//! Error taxonomy.
//!
//! Kinds are short categorical labels used to group and filter errors.
//! The set is open: crates define their own kinds with
//! [`ErrorKind::from_static`] alongside the built-in ones, the way
//! `wonder-stuff-server` adds its service kinds.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A categorical error label such as `InvalidInput` or `Internal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorKind(Cow<'static, str>);

impl ErrorKind {
    /// The error cause is not known.
    pub const UNKNOWN: Self = Self::from_static("Unknown");
    /// Something went wrong inside the system itself.
    pub const INTERNAL: Self = Self::from_static("Internal");
    /// A caller supplied input that could not be used.
    pub const INVALID_INPUT: Self = Self::from_static("InvalidInput");
    /// An API was used in a way it does not support.
    pub const INVALID_USE: Self = Self::from_static("InvalidUse");
    /// A requested resource does not exist.
    pub const NOT_FOUND: Self = Self::from_static("NotFound");
    /// The operation is not permitted.
    pub const NOT_ALLOWED: Self = Self::from_static("NotAllowed");
    /// The caller is not authenticated.
    pub const UNAUTHORIZED: Self = Self::from_static("Unauthorized");
    /// The operation has not been implemented.
    pub const NOT_IMPLEMENTED: Self = Self::from_static("NotImplemented");

    /// Create a kind from a static label.
    #[must_use]
    pub const fn from_static(kind: &'static str) -> Self {
        Self(Cow::Borrowed(kind))
    }

    /// Create a kind from any label.
    #[must_use]
    pub fn new(kind: impl Into<Cow<'static, str>>) -> Self {
        Self(kind.into())
    }

    /// The label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the label is usable: non-empty and free of whitespace.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && !contains_whitespace(&self.0)
    }
}

impl Default for ErrorKind {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ErrorKind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ErrorKind {
    fn from(kind: &'static str) -> Self {
        Self::from_static(kind)
    }
}

/// The built-in kinds.
pub struct Errors;

impl Errors {
    /// Every built-in kind, in declaration order.
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::UNKNOWN,
        ErrorKind::INTERNAL,
        ErrorKind::INVALID_INPUT,
        ErrorKind::INVALID_USE,
        ErrorKind::NOT_FOUND,
        ErrorKind::NOT_ALLOWED,
        ErrorKind::UNAUTHORIZED,
        ErrorKind::NOT_IMPLEMENTED,
    ];
}

pub(crate) fn contains_whitespace(s: &str) -> bool {
    s.chars().any(char::is_whitespace)
}
