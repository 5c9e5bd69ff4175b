//! Reducing a chain of errors into one set of Sentry data.
//!
//! The chain is gathered outermost error first and folded from the right,
//! so the root cause's data is applied first and each more recent error
//! overrides it. Given
//!
//! ```text
//! index 0: outer  tags {x: "A"}
//! index 1: inner  tags {x: "B"}
//! ```
//!
//! the collated tag `x` is `"A"`.

use std::collections::HashSet;

use serde_json::{Map, Value};
use wonder_stuff_core::text::{collapse_line_breaks, first_non_blank_line};
use wonder_stuff_core::{errors_from_error, ErrorOrder, ErrorRef};

use crate::data::{sentry_data_with_options, SentryContext, SentryData};
use crate::normalize::truncate_tag_value;
use crate::options::KindErrorDataOptions;

/// Fold one error's Sentry data into the accumulated data.
///
/// `index` is the error's position in the consequence-first chain. Every
/// error other than the outermost also contributes a context named
/// `{causal_error_context_prefix}{index}` describing it.
#[must_use]
pub fn sentry_data_reducer(
    acc: SentryData,
    error: ErrorRef<'_>,
    index: usize,
    options: &KindErrorDataOptions,
) -> SentryData {
    let data = sentry_data_with_options(error, options);
    let causal_context = (index != 0).then(|| causal_error_context(error, &data));

    let SentryData {
        mut tags,
        mut contexts,
        fingerprint,
    } = acc;

    tags.extend(data.tags);
    contexts.extend(data.contexts);
    if let Some(context) = causal_context {
        contexts.insert(
            format!("{}{index}", options.causal_error_context_prefix),
            context,
        );
    }

    let mut seen = HashSet::new();
    let fingerprint = fingerprint
        .into_iter()
        .chain(data.fingerprint)
        .filter(|part| !part.is_empty() && seen.insert(part.clone()))
        .collect();

    SentryData {
        tags,
        contexts,
        fingerprint,
    }
}

/// Collate the Sentry data of `error` and all of its causes.
///
/// Besides the merged data, the result carries three computed tags
/// describing the outermost error: its kind, its whole message on one
/// line, and the first line of its message (left out when blank).
#[must_use]
pub fn collate_sentry_data(error: ErrorRef<'_>, options: &KindErrorDataOptions) -> SentryData {
    let chain: Vec<_> = errors_from_error(Some(error), ErrorOrder::ConsequenceFirst).collect();

    let mut data = chain
        .iter()
        .copied()
        .enumerate()
        .rev()
        .fold(SentryData::default(), |acc, (index, error)| {
            sentry_data_reducer(acc, error, index, options)
        });

    let kind = error.kind().cloned().unwrap_or_default();
    data.tags.insert(
        options.kind_tag_name.clone(),
        truncate_tag_value(kind.as_str()).into_owned(),
    );

    let concatenated = collapse_line_breaks(error.message());
    data.tags.insert(
        options.concatenated_message_tag_name.clone(),
        truncate_tag_value(&concatenated).into_owned(),
    );

    let group_by = first_non_blank_line(error.message());
    if !group_by.is_empty() {
        data.tags.insert(
            options.group_by_tag_name.clone(),
            truncate_tag_value(group_by).into_owned(),
        );
    }

    data
}

/// A readable snapshot of one error in the chain.
fn causal_error_context(error: ErrorRef<'_>, data: &SentryData) -> SentryContext {
    let mut context = Map::new();
    context.insert("error".to_owned(), Value::String(error.to_string()));
    context.insert(
        "sentry_data".to_owned(),
        Value::String(serde_json::to_string(data).unwrap_or_default()),
    );
    context.insert(
        "location".to_owned(),
        error
            .location()
            .map_or(Value::Null, |location| Value::String(location.to_string())),
    );
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::KindSentryError;
    use serde_json::json;
    use wonder_stuff_core::{ErrorKind, KindError, OpaqueError};

    fn options() -> KindErrorDataOptions {
        KindErrorDataOptions::default()
    }

    fn sentry_error(message: &str, data: SentryData) -> KindSentryError {
        KindSentryError::builder(message, ErrorKind::INTERNAL)
            .sentry_data(data)
            .build_with_options(&options())
            .unwrap()
    }

    #[test]
    fn reducer_overrides_and_dedupes() {
        let acc = SentryData::new()
            .with_tag("x", "inner")
            .with_tag("y", "kept")
            .with_fingerprint(["a", "b"]);
        let error = sentry_error(
            "outer",
            SentryData::new()
                .with_tag("x", "outer")
                .with_fingerprint(["b", "", "c"]),
        );

        let result = sentry_data_reducer(acc, error.as_error_ref(), 0, &options());

        assert_eq!(result.tags["x"], "outer");
        assert_eq!(result.tags["y"], "kept");
        assert_eq!(result.fingerprint, ["a", "b", "c"]);
        assert!(result.contexts.is_empty());
    }

    #[test]
    fn reducer_adds_causal_context_after_index_zero() {
        let error = sentry_error("inner", SentryData::new().with_tag("t", "v"));

        let result =
            sentry_data_reducer(SentryData::default(), error.as_error_ref(), 2, &options());

        let context = &result.contexts["Source Error - 2"];
        assert_eq!(context["error"], json!("InternalError: inner"));
        let stored: SentryData =
            serde_json::from_str(context["sentry_data"].as_str().unwrap()).unwrap();
        assert_eq!(stored.tags["t"], "v");
        assert!(context["location"].as_str().unwrap().contains("collate.rs"));
    }

    #[test]
    fn computed_tags_for_plain_error() {
        let error = OpaqueError::new("Error", "\n  Something broke\n\tdetail");

        let data = collate_sentry_data((&error).into(), &options());

        assert_eq!(data.tags["kind"], "Unknown");
        assert_eq!(data.tags["group_by_message"], "Something broke");
        assert_eq!(data.tags["concatenated_message"], "Something broke detail");
        assert!(data.contexts.is_empty());
    }

    #[test]
    fn plain_kind_error_data_is_validated_before_merging() {
        let long_key = "k".repeat(40);
        let inner = KindError::builder("inner", ErrorKind::INTERNAL)
            .metadata(
                [(
                    "sentry",
                    json!({
                        "tags": {long_key: "v".repeat(500)},
                        "contexts": {"c": {"type": "x"}},
                    }),
                )]
                .into_iter()
                .collect::<wonder_stuff_core::Metadata>(),
            )
            .build();
        let outer = KindError::builder("outer", ErrorKind::INTERNAL)
            .metadata(
                [("sentry", json!({"tags": {"region": "r".repeat(500)}}))]
                    .into_iter()
                    .collect::<wonder_stuff_core::Metadata>(),
            )
            .cause(inner)
            .build();

        let data = collate_sentry_data(outer.as_error_ref(), &options());

        assert_eq!(data.tags["region"].chars().count(), 200);
        assert!(data.tags.values().all(|value| value.chars().count() <= 200));
        assert!(!data.contexts.contains_key("c"));
    }

    #[test]
    fn blank_message_has_no_group_by_tag() {
        let error = KindError::new("  \n ", ErrorKind::INVALID_USE);

        let data = collate_sentry_data(error.as_error_ref(), &options());

        assert_eq!(data.tags["kind"], "InvalidUse");
        assert!(!data.tags.contains_key("group_by_message"));
    }

    #[test]
    fn long_messages_are_truncated_in_tags() {
        let error = KindError::new("m".repeat(500), ErrorKind::INTERNAL);

        let data = collate_sentry_data(error.as_error_ref(), &options());

        assert_eq!(data.tags["concatenated_message"].chars().count(), 200);
        assert_eq!(data.tags["group_by_message"].chars().count(), 200);
    }
}
