//! Bootstrap-script (user-data) resolution utilities.
//!
//! The bastion host can be seeded with a shell script or cloud-config payload
//! read from a local file. This module centralises path expansion, file
//! loading, and emptiness checks so the configuration layer stays small.

use thiserror::Error;

use crate::fs::open_parent_dir;

/// Errors raised while resolving the bootstrap script.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum UserDataError {
    /// Raised when the configured file path is empty or only whitespace.
    #[error("user-data file path must not be empty")]
    PathEmpty,
    /// Raised when the file resolves to empty or only whitespace.
    #[error("user-data file must not be empty")]
    FileEmpty,
    /// Raised when reading the file fails.
    #[error("failed to read user-data file `{path}`: {message}")]
    FileRead {
        /// Expanded path that failed to read.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

/// Resolves the optional bootstrap script from a file path.
///
/// The content is embedded verbatim into the instance declaration, so the
/// original bytes are preserved; only the emptiness check trims.
///
/// # Errors
///
/// Returns [`UserDataError`] when the path is empty, the file cannot be
/// read, or the file holds only whitespace.
pub fn resolve_user_data(file: Option<&str>) -> Result<Option<String>, UserDataError> {
    let Some(path) = file else {
        return Ok(None);
    };

    if path.trim().is_empty() {
        return Err(UserDataError::PathEmpty);
    }

    let expanded = expand_tilde(path);
    let content = read_to_string_ambient(&expanded).map_err(|message| UserDataError::FileRead {
        path: expanded.clone(),
        message,
    })?;

    if content.trim().is_empty() {
        return Err(UserDataError::FileEmpty);
    }

    Ok(Some(content))
}

/// Expands a leading `~/` prefix to the user's home directory.
///
/// If the `HOME` environment variable is not set, the input string is
/// returned unchanged.
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

fn read_to_string_ambient(path: &str) -> Result<String, String> {
    let (dir, file_path) = open_parent_dir(path)?;
    dir.read_to_string(file_path).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_none_without_a_path() {
        assert_eq!(resolve_user_data(None), Ok(None));
    }

    #[test]
    fn resolve_rejects_blank_path() {
        assert_eq!(
            resolve_user_data(Some("   ")),
            Err(UserDataError::PathEmpty)
        );
    }

    #[test]
    fn resolve_reports_missing_file_with_path() {
        let result = resolve_user_data(Some("/definitely/not/here.sh"));
        let Err(UserDataError::FileRead { path, .. }) = result else {
            panic!("expected FileRead, got {result:?}");
        };
        assert_eq!(path, "/definitely/not/here.sh");
    }

    #[test]
    fn resolve_reads_file_content_verbatim() {
        let tmp = tempfile::TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = tmp.path().join("bootstrap.sh");
        std::fs::write(&path, "#!/bin/sh\necho hello\n")
            .unwrap_or_else(|err| panic!("write script: {err}"));
        let path_str = path
            .to_str()
            .unwrap_or_else(|| panic!("temp path should be utf8"))
            .to_owned();

        let content = resolve_user_data(Some(&path_str))
            .unwrap_or_else(|err| panic!("resolve should succeed: {err}"));
        assert_eq!(content.as_deref(), Some("#!/bin/sh\necho hello\n"));
    }

    #[test]
    fn resolve_rejects_whitespace_only_file() {
        let tmp = tempfile::TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = tmp.path().join("blank.sh");
        std::fs::write(&path, "  \n\t\n").unwrap_or_else(|err| panic!("write script: {err}"));
        let path_str = path
            .to_str()
            .unwrap_or_else(|| panic!("temp path should be utf8"))
            .to_owned();

        assert_eq!(
            resolve_user_data(Some(&path_str)),
            Err(UserDataError::FileEmpty)
        );
    }

    #[tokio::test]
    async fn expand_tilde_uses_home() {
        let _guard = crate::test_support::EnvGuard::set_vars(&[("HOME", "/home/casey")]).await;
        assert_eq!(expand_tilde("~/scripts/boot.sh"), "/home/casey/scripts/boot.sh");
        assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
    }
}
