//! Mobile release branch names.

use std::sync::LazyLock;

use regex::Regex;

/// `release/<path>/v1.2.3`, with the leading `v` optional.
#[allow(clippy::incompatible_msrv)]
static RELEASE_BRANCH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(release/(?:[A-Za-z0-9_-]+/)*)v?(\d+\.\d+\.\d+)$").ok());

/// The parts of a mobile release branch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileReleaseInfo {
    /// Everything before the version, including the trailing slash.
    pub prefix: String,
    /// The version without any `v`.
    pub version: String,
}

/// Split a release branch name into its prefix and version.
///
/// Returns `None` for anything that is not a release branch.
#[must_use]
#[allow(clippy::incompatible_msrv)]
pub fn extract_mobile_release_info_from_branch_name(branch: &str) -> Option<MobileReleaseInfo> {
    let captures = RELEASE_BRANCH.as_ref()?.captures(branch.trim())?;
    Some(MobileReleaseInfo {
        prefix: captures.get(1)?.as_str().to_owned(),
        version: captures.get(2)?.as_str().to_owned(),
    })
}
