//! Names used when turning error chains into Sentry data.

use std::sync::{LazyLock, OnceLock};

use serde::{Deserialize, Serialize};
use wonder_stuff_core::{ErrorKind, KindError};

/// Default name of the tag holding the leaf error's kind.
pub const DEFAULT_KIND_TAG_NAME: &str = "kind";

/// Default name of the tag holding the first line of the leaf message.
pub const DEFAULT_GROUP_BY_TAG_NAME: &str = "group_by_message";

/// Default name of the tag holding the whole causal message on one line.
pub const DEFAULT_CONCATENATED_MESSAGE_TAG_NAME: &str = "concatenated_message";

/// Default prefix for the per-cause context names.
pub const DEFAULT_CAUSAL_ERROR_CONTEXT_PREFIX: &str = "Source Error - ";

/// Tag and context names used by the collator.
///
/// The three tag names are reserved: errors may not set tags with these
/// keys themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindErrorDataOptions {
    pub kind_tag_name: String,
    pub group_by_tag_name: String,
    pub concatenated_message_tag_name: String,
    pub causal_error_context_prefix: String,
}

impl Default for KindErrorDataOptions {
    fn default() -> Self {
        Self {
            kind_tag_name: DEFAULT_KIND_TAG_NAME.to_owned(),
            group_by_tag_name: DEFAULT_GROUP_BY_TAG_NAME.to_owned(),
            concatenated_message_tag_name: DEFAULT_CONCATENATED_MESSAGE_TAG_NAME.to_owned(),
            causal_error_context_prefix: DEFAULT_CAUSAL_ERROR_CONTEXT_PREFIX.to_owned(),
        }
    }
}

impl KindErrorDataOptions {
    /// The tag keys the collator writes itself.
    #[must_use]
    pub fn reserved_tag_keys(&self) -> [&str; 3] {
        [
            &self.kind_tag_name,
            &self.group_by_tag_name,
            &self.concatenated_message_tag_name,
        ]
    }
}

static CONFIGURED: OnceLock<KindErrorDataOptions> = OnceLock::new();

#[allow(clippy::incompatible_msrv)]
static DEFAULTS: LazyLock<KindErrorDataOptions> = LazyLock::new(KindErrorDataOptions::default);

/// Set the process-wide options. This can happen once per process.
pub fn configure_kind_error_data_options(options: KindErrorDataOptions) -> Result<(), KindError> {
    CONFIGURED.set(options).map_err(|_| {
        KindError::new(
            "Kind error data options have already been configured",
            ErrorKind::INVALID_USE,
        )
    })
}

/// The process-wide options, or the defaults if none were configured.
#[must_use]
pub fn kind_error_data_options() -> &'static KindErrorDataOptions {
    CONFIGURED.get().unwrap_or_else(|| &*DEFAULTS)
}
