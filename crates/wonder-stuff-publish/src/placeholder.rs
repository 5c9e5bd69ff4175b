//! The placeholder package written to a temporary directory.

use std::fs;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tempfile::TempDir;
use wonder_stuff_core::{ErrorKind, KindError};

/// Version given to every placeholder release.
pub const PLACEHOLDER_VERSION: &str = "0.0.1";

/// Write `package.json`, `README.md` and `.npmrc` into a new temporary
/// directory. The directory is removed when the returned handle drops.
pub fn create(package_name: &str, token: &SecretString) -> Result<TempDir, KindError> {
    let dir = tempfile::Builder::new()
        .prefix("publish-new-package-")
        .tempdir()
        .map_err(|e| io_error("Could not create a temporary directory", e))?;

    let files = [
        ("package.json", package_json(package_name)),
        ("README.md", readme(package_name)),
    ];
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents)
            .map_err(|e| io_error(&format!("Could not write {name}"), e))?;
    }
    fs::write(dir.path().join(".npmrc"), npmrc(token).expose_secret())
        .map_err(|e| io_error("Could not write .npmrc", e))?;

    Ok(dir)
}

fn package_json(package_name: &str) -> String {
    let manifest = json!({
        "name": package_name,
        "version": PLACEHOLDER_VERSION,
        "description": "Placeholder release reserving this package name.",
        "license": "MIT",
    });
    format!("{manifest:#}\n")
}

fn readme(package_name: &str) -> String {
    format!(
        "# {package_name}\n\n\
         This is a placeholder release. The real package has not been published yet.\n"
    )
}

fn npmrc(token: &SecretString) -> SecretString {
    SecretString::from(format!(
        "//registry.npmjs.org/:_authToken={}\n",
        token.expose_secret()
    ))
}

#[track_caller]
fn io_error(message: &str, error: std::io::Error) -> KindError {
    KindError::builder(message, ErrorKind::INTERNAL)
        .opaque_cause(error)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_all_placeholder_files() {
        let raw = format!("npm_{}", "a".repeat(36));
        let token = SecretString::from(raw.clone());
        let dir = create("@khanacademy/shiny-new-thing", &token).unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["name"], "@khanacademy/shiny-new-thing");
        assert_eq!(manifest["version"], PLACEHOLDER_VERSION);

        let readme = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(readme.starts_with("# @khanacademy/shiny-new-thing\n"));

        let npmrc = fs::read_to_string(dir.path().join(".npmrc")).unwrap();
        assert_eq!(npmrc, format!("//registry.npmjs.org/:_authToken={raw}\n"));
    }

    #[test]
    fn directory_is_removed_on_drop() {
        let dir = create("pkg", &SecretString::from("npm_token".to_owned())).unwrap();
        let path = dir.path().to_owned();
        drop(dir);
        assert!(!path.exists());
    }
}
