//! Sentry reporting for kind error chains.
//!
//! Errors carry partial [`SentryData`] (tags, contexts, fingerprint).
//! When one is reported, the data of every error in its cause chain is
//! collated into a single payload:
//!
//! ```text
//! ┌──────────────────┐    ┌─────────────────────┐    ┌────────────────┐
//! │ KindSentryError  │───>│ collate_sentry_data │───>│ KindErrorData  │
//! │ (normalize.rs)   │    │ (collate.rs)        │    │ (integration)  │
//! └──────────────────┘    └─────────────────────┘    └────────────────┘
//!   validate + store        fold the chain,            merge into the
//!   per-error data          add computed tags          outgoing event
//! ```

mod collate;
mod data;
mod integration;
mod normalize;
mod options;

pub use collate::{collate_sentry_data, sentry_data_reducer};
pub use data::{
    sentry_data_of, sentry_data_with_options, KindSentryError, KindSentryErrorBuilder,
    SentryContext, SentryData, SENTRY_METADATA_KEY,
};
pub use integration::{KindErrorData, SentryEvent};
pub use normalize::{
    is_reserved_context_property, is_reserved_tag_key, is_tag_key_valid, normalize_sentry_data,
    truncate_tag_value, MAX_TAG_KEY_LENGTH, MAX_TAG_VALUE_LENGTH, RESERVED_CONTEXT_PROPERTY,
    VALIDATION_CONTEXT_NAME,
};
pub use options::{
    configure_kind_error_data_options, kind_error_data_options, KindErrorDataOptions,
    DEFAULT_CAUSAL_ERROR_CONTEXT_PREFIX, DEFAULT_CONCATENATED_MESSAGE_TAG_NAME,
    DEFAULT_GROUP_BY_TAG_NAME, DEFAULT_KIND_TAG_NAME,
};
