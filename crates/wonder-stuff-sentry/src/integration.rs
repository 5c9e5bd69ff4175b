//! Attaching collated error data to outgoing Sentry events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wonder_stuff_core::ErrorRef;

use crate::collate::collate_sentry_data;
use crate::data::SentryContext;
use crate::options::{kind_error_data_options, KindErrorDataOptions};

/// The parts of a Sentry event this crate reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentryEvent {
    /// Event message, when the event was not raised from an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Event tags.
    pub tags: BTreeMap<String, String>,
    /// Event contexts by name.
    pub contexts: BTreeMap<String, SentryContext>,
    /// Grouping fingerprint.
    pub fingerprint: Vec<String>,
}

/// Event processor that enriches events with data collated from the
/// error that triggered them.
#[derive(Debug, Clone, Default)]
pub struct KindErrorData {
    options: KindErrorDataOptions,
}

impl KindErrorData {
    /// Identifies the processor in logs.
    pub const NAME: &'static str = "KindErrorData";

    #[must_use]
    pub const fn new(options: KindErrorDataOptions) -> Self {
        Self { options }
    }

    /// A processor using the process-wide options.
    #[must_use]
    pub fn from_process_options() -> Self {
        Self::new(kind_error_data_options().clone())
    }

    #[must_use]
    pub fn options(&self) -> &KindErrorDataOptions {
        &self.options
    }

    /// Merge the collated data for `error` into `event`.
    ///
    /// Collated tags and contexts win over what the event already has. The
    /// collated fingerprint is appended to the event's fingerprint rather
    /// than replacing it. Events without an originating error pass through
    /// unchanged.
    #[must_use]
    pub fn process_event(
        &self,
        mut event: SentryEvent,
        error: Option<ErrorRef<'_>>,
    ) -> SentryEvent {
        let Some(error) = error else {
            return event;
        };

        let data = collate_sentry_data(error, &self.options);
        tracing::trace!(
            processor = Self::NAME,
            tags = data.tags.len(),
            contexts = data.contexts.len(),
            fingerprint = data.fingerprint.len(),
            "Collated sentry data"
        );

        event.tags.extend(data.tags);
        event.contexts.extend(data.contexts);
        event.fingerprint.extend(data.fingerprint);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{KindSentryError, SentryData};
    use wonder_stuff_core::{ErrorKind, KindError};

    #[test]
    fn event_without_error_is_untouched() {
        let event = SentryEvent {
            message: Some("hello".to_owned()),
            ..Default::default()
        };
        let processed = KindErrorData::default().process_event(event.clone(), None);
        assert_eq!(processed, event);
    }

    #[test]
    fn collated_data_merges_into_event() {
        let processor = KindErrorData::default();
        let error = KindSentryError::builder("Payment failed", ErrorKind::INTERNAL)
            .sentry_data(
                SentryData::new()
                    .with_tag("region", "eu")
                    .with_fingerprint(["payments"]),
            )
            .build_with_options(processor.options())
            .unwrap();

        let mut event = SentryEvent::default();
        event.tags.insert("region".to_owned(), "us".to_owned());
        event.tags.insert("release".to_owned(), "1.0".to_owned());
        event.fingerprint.push("{{ default }}".to_owned());

        let processed = processor.process_event(event, Some(error.as_error_ref()));

        assert_eq!(processed.tags["region"], "eu");
        assert_eq!(processed.tags["release"], "1.0");
        assert_eq!(processed.tags["kind"], "Internal");
        assert_eq!(processed.fingerprint, ["{{ default }}", "payments"]);
    }

    #[test]
    fn plain_kind_error_still_gets_computed_tags() {
        let error = KindError::new("Boom", ErrorKind::NOT_FOUND);
        let processed = KindErrorData::default()
            .process_event(SentryEvent::default(), Some(error.as_error_ref()));
        assert_eq!(processed.tags["kind"], "NotFound");
        assert_eq!(processed.tags["group_by_message"], "Boom");
        assert!(processed.fingerprint.is_empty());
    }
}
