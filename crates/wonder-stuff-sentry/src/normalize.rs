//! Validation and normalisation of Sentry data.
//!
//! Sentry rejects tag keys longer than 32 characters and tag values longer
//! than 200. Keys are the caller's responsibility and are rejected; values
//! are truncated. Context objects may not define a `type` property because
//! Sentry uses it to pick how a context is rendered.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use wonder_stuff_core::text::truncate_middle;
use wonder_stuff_core::ErrorKind;

use crate::data::{unchecked_sentry_error, KindSentryError, SentryData};
use crate::options::KindErrorDataOptions;

/// Longest tag key Sentry accepts.
pub const MAX_TAG_KEY_LENGTH: usize = 32;

/// Longest tag value Sentry accepts.
pub const MAX_TAG_VALUE_LENGTH: usize = 200;

/// Property name contexts may not use.
pub const RESERVED_CONTEXT_PROPERTY: &str = "type";

/// Name of the context describing why Sentry data was rejected.
pub const VALIDATION_CONTEXT_NAME: &str = "Sentry Data Validation";

/// Whether `key` has an acceptable length.
#[must_use]
pub fn is_tag_key_valid(key: &str) -> bool {
    let len = key.chars().count();
    len > 0 && len <= MAX_TAG_KEY_LENGTH
}

/// Whether `key` is one of the tag names the collator writes itself.
#[must_use]
pub fn is_reserved_tag_key(key: &str, options: &KindErrorDataOptions) -> bool {
    options.reserved_tag_keys().contains(&key)
}

/// Whether `property` may not appear in a context.
#[must_use]
pub fn is_reserved_context_property(property: &str) -> bool {
    property == RESERVED_CONTEXT_PROPERTY
}

/// Truncate a tag value to the length Sentry accepts.
#[must_use]
pub fn truncate_tag_value(value: &str) -> Cow<'_, str> {
    truncate_middle(value, MAX_TAG_VALUE_LENGTH)
}

/// Everything wrong with a piece of Sentry data.
#[derive(Debug, Default, Serialize)]
struct Violations {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    invalid_tag_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reserved_tag_keys: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    reserved_context_properties: BTreeMap<String, Vec<String>>,
}

impl Violations {
    fn collect(data: &SentryData, options: &KindErrorDataOptions) -> Self {
        let mut violations = Self::default();

        for key in data.tags.keys() {
            if !is_tag_key_valid(key) {
                violations.invalid_tag_keys.push(key.clone());
            }
            if is_reserved_tag_key(key, options) {
                violations.reserved_tag_keys.push(key.clone());
            }
        }

        for (name, context) in &data.contexts {
            let reserved: Vec<String> = context
                .keys()
                .filter(|property| is_reserved_context_property(property))
                .cloned()
                .collect();
            if !reserved.is_empty() {
                violations
                    .reserved_context_properties
                    .insert(name.clone(), reserved);
            }
        }

        violations
    }

    fn is_empty(&self) -> bool {
        self.invalid_tag_keys.is_empty()
            && self.reserved_tag_keys.is_empty()
            && self.reserved_context_properties.is_empty()
    }

    fn into_context(self) -> crate::data::SentryContext {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => crate::data::SentryContext::new(),
        }
    }
}

/// Validate `data` and truncate its tag values.
///
/// Invalid tag keys, reserved tag keys and reserved context properties are
/// all collected before failing, and the returned `InvalidInput` error
/// lists them in a context named [`VALIDATION_CONTEXT_NAME`].
#[track_caller]
pub fn normalize_sentry_data(
    data: SentryData,
    options: &KindErrorDataOptions,
) -> Result<SentryData, KindSentryError> {
    let violations = Violations::collect(&data, options);
    if !violations.is_empty() {
        let diagnostics =
            SentryData::new().with_context(VALIDATION_CONTEXT_NAME, violations.into_context());
        return Err(unchecked_sentry_error(
            "Invalid Sentry data",
            ErrorKind::INVALID_INPUT,
            &diagnostics,
        ));
    }

    let SentryData {
        tags,
        contexts,
        fingerprint,
    } = data;

    Ok(SentryData {
        tags: tags
            .into_iter()
            .map(|(key, value)| {
                let value = match truncate_tag_value(&value) {
                    Cow::Borrowed(_) => value,
                    Cow::Owned(truncated) => truncated,
                };
                (key, value)
            })
            .collect(),
        contexts,
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: Value) -> crate::data::SentryContext {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn validation_context(error: &KindSentryError) -> Value {
        Value::Object(
            error
                .sentry_data()
                .contexts
                .remove(VALIDATION_CONTEXT_NAME)
                .expect("validation context"),
        )
    }

    #[test]
    fn tag_key_lengths() {
        assert!(!is_tag_key_valid(""));
        assert!(is_tag_key_valid("a"));
        assert!(is_tag_key_valid(&"k".repeat(32)));
        assert!(!is_tag_key_valid(&"k".repeat(33)));
    }

    #[test]
    fn reserved_tag_keys_follow_options() {
        let options = KindErrorDataOptions {
            kind_tag_name: "error_kind".to_owned(),
            ..Default::default()
        };
        assert!(is_reserved_tag_key("error_kind", &options));
        assert!(!is_reserved_tag_key("kind", &options));
        assert!(is_reserved_tag_key("group_by_message", &options));
    }

    #[test]
    fn valid_data_passes_with_truncated_values() {
        let data = SentryData::new()
            .with_tag("short", "value")
            .with_tag("long", "v".repeat(300))
            .with_fingerprint(["a", "b"]);

        let normalised = normalize_sentry_data(data, &KindErrorDataOptions::default()).unwrap();

        assert_eq!(normalised.tags["short"], "value");
        assert_eq!(normalised.tags["long"].chars().count(), MAX_TAG_VALUE_LENGTH);
        assert!(normalised.tags["long"].contains("..."));
        assert_eq!(normalised.fingerprint, ["a", "b"]);
    }

    #[test]
    fn reserved_key_is_reported() {
        let data = SentryData::new().with_tag("kind", "Mine");

        let error = normalize_sentry_data(data, &KindErrorDataOptions::default()).unwrap_err();

        assert_eq!(error.kind(), &ErrorKind::INVALID_INPUT);
        assert_eq!(
            validation_context(&error),
            json!({"reserved_tag_keys": ["kind"]})
        );
    }

    #[test]
    fn all_violations_are_collected() {
        let long_key = "x".repeat(40);
        let data = SentryData::new()
            .with_tag(long_key.clone(), "v")
            .with_tag("", "empty")
            .with_tag("concatenated_message", "nope")
            .with_context("ok", context(json!({"fine": 1})))
            .with_context("bad", context(json!({"type": "os", "other": 2})));

        let error = normalize_sentry_data(data, &KindErrorDataOptions::default()).unwrap_err();

        assert_eq!(
            validation_context(&error),
            json!({
                "invalid_tag_keys": ["", long_key],
                "reserved_tag_keys": ["concatenated_message"],
                "reserved_context_properties": {"bad": ["type"]},
            })
        );
    }

    #[test]
    fn truncate_tag_value_is_idempotent() {
        for len in [0, 1, 199, 200, 201, 1000] {
            let value = "é".repeat(len);
            let once = truncate_tag_value(&value).into_owned();
            assert_eq!(truncate_tag_value(&once), once);
            assert!(once.chars().count() <= MAX_TAG_VALUE_LENGTH);
        }
    }
}
