//! Categorised, cause-chained errors.
//!
//! The pieces fit together like this:
//!
//! ```text
//! ┌───────────┐ cause ┌───────────┐ cause ┌─────────────┐
//! │ KindError │──────>│ KindError │──────>│ OpaqueError │
//! └───────────┘       └───────────┘       └─────────────┘
//!       │
//!       v
//! errors_from_error(..) walks the chain in either direction
//! ```
//!
//! # Example
//!
//! ```
//! use wonder_stuff_core::{errors_from_error, ErrorKind, ErrorOrder, KindError};
//!
//! let cause = KindError::new("no such user", ErrorKind::NOT_FOUND);
//! let error = KindError::caused_by("Could not load profile", ErrorKind::INTERNAL, cause);
//!
//! assert!(error.message().contains("caused by"));
//! let kinds: Vec<_> = errors_from_error(Some(error.as_error_ref()), ErrorOrder::CauseFirst)
//!     .filter_map(|e| e.kind().cloned())
//!     .collect();
//! assert_eq!(kinds, [ErrorKind::NOT_FOUND, ErrorKind::INTERNAL]);
//! ```

pub mod chain;
pub mod error_info;
pub mod kind;
pub mod kind_error;
pub mod metadata;
pub mod text;

pub use chain::{errors_from_error, ErrorChain, ErrorOrder};
pub use error_info::ErrorInfo;
pub use kind::{ErrorKind, Errors};
pub use kind_error::{
    ConstructionError, ErrorCause, ErrorRef, KindError, KindErrorBuilder, OpaqueError,
};
pub use metadata::Metadata;
