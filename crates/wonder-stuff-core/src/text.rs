//! String helpers shared by error formatting and reporting.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Separator inserted by [`truncate_middle`].
pub const ELLIPSIS: &str = "...";

/// Matches runs of newlines and tabs, with any spaces hugging them.
#[allow(clippy::incompatible_msrv)]
static LINE_BREAKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r" *[\r\n\t]+[\r\n\t ]*").ok());

/// The first line of `message` that contains something other than
/// whitespace, trimmed. Empty if there is no such line.
#[must_use]
pub fn first_non_blank_line(message: &str) -> &str {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

/// Describe `consequence` as having been caused by another error.
///
/// `cause_with_name` is the cause rendered as `"{name}: {message}"`.
#[must_use]
pub fn build_caused_by_message(consequence: &str, cause_with_name: &str) -> String {
    format!("{consequence}\n\tcaused by\n\t\t{cause_with_name}")
}

/// Shorten `text` to at most `max_len` characters by cutting out the middle.
///
/// The result is `prefix + "..." + suffix`, where the prefix takes the
/// larger half of the remaining budget. Text that already fits is
/// returned untouched, which makes the operation idempotent.
#[must_use]
pub fn truncate_middle(text: &str, max_len: usize) -> Cow<'_, str> {
    let len = text.chars().count();
    if len <= max_len {
        return Cow::Borrowed(text);
    }

    let ellipsis_len = ELLIPSIS.chars().count();
    if max_len <= ellipsis_len {
        return Cow::Owned(text.chars().take(max_len).collect());
    }

    let budget = max_len - ellipsis_len;
    let suffix_len = budget / 2;
    let prefix_len = budget - suffix_len;

    let prefix: String = text.chars().take(prefix_len).collect();
    let suffix: String = text.chars().skip(len - suffix_len).collect();
    Cow::Owned(format!("{prefix}{ELLIPSIS}{suffix}"))
}

/// Collapse newline and tab runs into single spaces so a multi-line
/// message reads as one line. Leading and trailing whitespace is dropped.
#[must_use]
pub fn collapse_line_breaks(message: &str) -> String {
    match LINE_BREAKS.as_ref() {
        Some(pattern) => pattern.replace_all(message, " ").trim().to_owned(),
        None => message.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}
