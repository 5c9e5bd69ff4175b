//! Input validation and the `npm publish` subprocess.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;

use regex::Regex;
use secrecy::zeroize::Zeroize;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;
use wonder_stuff_core::{ErrorKind, KindError};

/// Every registry access token starts with this.
pub const TOKEN_PREFIX: &str = "npm_";
/// Shortest token accepted, prefix included.
pub const MIN_TOKEN_LENGTH: usize = 40;
const MAX_PACKAGE_NAME_LENGTH: usize = 214;

#[allow(clippy::incompatible_msrv)]
static PACKAGE_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:@[a-z0-9~-][a-z0-9._~-]*/)?[a-z0-9~-][a-z0-9._~-]*$").ok()
});

/// Failure running `npm publish`.
#[derive(Debug, thiserror::Error)]
pub enum NpmError {
    #[error("could not run npm: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("npm exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

/// Registry package names: lowercase, URL-safe, optionally scoped.
#[allow(clippy::incompatible_msrv)]
pub fn validate_package_name(name: &str) -> Result<(), KindError> {
    let valid = name.len() <= MAX_PACKAGE_NAME_LENGTH
        && PACKAGE_NAME
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(name));
    if valid {
        Ok(())
    } else {
        Err(KindError::new(
            format!("Invalid package name: {name:?}"),
            ErrorKind::INVALID_INPUT,
        ))
    }
}

/// Registry tokens: the `npm_` prefix followed by letters and digits.
///
/// The error never includes the token itself.
pub fn validate_token(token: &SecretString) -> Result<(), KindError> {
    let token = token.expose_secret();
    let valid = token.len() >= MIN_TOKEN_LENGTH
        && token
            .strip_prefix(TOKEN_PREFIX)
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_alphanumeric()));
    if valid {
        Ok(())
    } else {
        Err(KindError::new(
            format!(
                "Invalid token: expected {TOKEN_PREFIX} followed by letters and digits, at least {MIN_TOKEN_LENGTH} characters"
            ),
            ErrorKind::INVALID_INPUT,
        ))
    }
}

/// Ask for an access token on stdin.
pub async fn prompt_for_token() -> Result<SecretString, KindError> {
    let mut stderr = tokio::io::stderr();
    stderr
        .write_all(b"Registry access token: ")
        .await
        .and(stderr.flush().await)
        .map_err(|e| {
            KindError::builder("Could not prompt for a token", ErrorKind::INTERNAL)
                .opaque_cause(e)
                .build()
        })?;

    let mut line = String::new();
    let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await;
    let token = SecretString::from(line.trim().to_owned());
    line.zeroize();

    read.map_err(|e| {
        KindError::builder("Could not read the token", ErrorKind::INTERNAL)
            .opaque_cause(e)
            .build()
    })?;
    Ok(token)
}

/// Run `npm publish --access public` in `dir`.
pub async fn npm_publish(dir: &Path) -> Result<(), KindError> {
    run_npm_publish(dir).await.map_err(|e| {
        KindError::builder("Failed to publish the placeholder package", ErrorKind::INTERNAL)
            .opaque_cause(e)
            .build()
    })
}

async fn run_npm_publish(dir: &Path) -> Result<(), NpmError> {
    let mut cmd = Command::new("npm");
    cmd.args(["publish", "--access", "public"])
        .current_dir(dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped());

    debug!(command = ?cmd, "Running npm publish");

    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(NpmError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    Ok(())
}
