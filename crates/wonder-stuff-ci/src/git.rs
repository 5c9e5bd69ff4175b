//! Release tag lookup via the `git` CLI.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::version::compare_versions;

/// Error type for git operations.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git tag --list failed: {0}")]
    ListTagsFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tags in `repo_dir` starting with `prefix` and followed by a version,
/// oldest version first.
pub async fn release_tags(repo_dir: &Path, prefix: &str) -> Result<Vec<String>, GitError> {
    let mut cmd = Command::new("git");
    cmd.arg("tag")
        .arg("--list")
        .arg(format!("{prefix}*"))
        .current_dir(repo_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(command = ?cmd, "Listing release tags");

    let output = cmd.output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::ListTagsFailed(stderr.trim().to_owned()));
    }

    Ok(sort_release_tags(
        &String::from_utf8_lossy(&output.stdout),
        prefix,
    ))
}

/// The tag with the highest version, if any.
pub async fn latest_release_tag(repo_dir: &Path, prefix: &str) -> Result<Option<String>, GitError> {
    Ok(release_tags(repo_dir, prefix).await?.pop())
}

/// Keep lines that are `prefix` followed by a version and sort them by
/// version.
fn sort_release_tags(listing: &str, prefix: &str) -> Vec<String> {
    let mut tags: Vec<String> = listing
        .lines()
        .map(str::trim)
        .filter(|tag| {
            tag.strip_prefix(prefix)
                .and_then(|rest| rest.trim_start_matches('v').chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .map(str::to_owned)
        .collect();
    tags.sort_by(|a, b| compare_versions(&a[prefix.len()..], &b[prefix.len()..]));
    tags
}
