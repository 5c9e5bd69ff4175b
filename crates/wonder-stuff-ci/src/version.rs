//! Numeric version ordering.

use std::cmp::Ordering;

/// Compare two versions segment by segment, numerically.
///
/// Anything before the first digit is ignored, so `"ios-1.2.3"` and
/// `"v1.2.3"` compare as `1.2.3`. Missing or non-numeric segments count
/// as zero.
///
/// ```
/// use std::cmp::Ordering;
/// use wonder_stuff_ci::compare_versions;
///
/// assert_eq!(compare_versions("ios-1.2.3", "ios-1.10.0"), Ordering::Less);
/// ```
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = segments(a);
    let b = segments(b);
    let len = a.len().max(b.len());

    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn segments(version: &str) -> Vec<u64> {
    let Some(start) = version.find(|c: char| c.is_ascii_digit()) else {
        return Vec::new();
    };
    version[start..].split('.').map(leading_number).collect()
}

fn leading_number(segment: &str) -> u64 {
    let end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    segment[..end].parse().unwrap_or(0)
}
