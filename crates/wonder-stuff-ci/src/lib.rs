//! Helpers for release automation: version ordering, mobile release branch
//! parsing and release tag lookup.

pub mod branch;
pub mod git;
pub mod version;

pub use branch::{extract_mobile_release_info_from_branch_name, MobileReleaseInfo};
pub use git::{latest_release_tag, release_tags, GitError};
pub use version::compare_versions;
