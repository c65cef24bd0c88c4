//! Ambient filesystem helpers shared by the file readers and writers.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

/// Opens the directory containing `path` with ambient authority.
///
/// Absolute paths are split into their parent directory and file name;
/// relative paths are resolved against the current directory. The returned
/// file path is always relative to the returned handle.
///
/// # Errors
///
/// Returns a message when the path has no parent or file name, or when the
/// directory cannot be opened.
pub fn open_parent_dir(path: &str) -> Result<(Dir, &Utf8Path), String> {
    let full = Utf8Path::new(path);

    let (dir_path, file_path) = if full.is_absolute() {
        let parent = full
            .parent()
            .ok_or_else(|| format!("path has no parent directory: {full}"))?;
        let file_name = full
            .file_name()
            .ok_or_else(|| format!("path has no file name: {full}"))?;
        (parent, Utf8Path::new(file_name))
    } else {
        (Utf8Path::new("."), full)
    };

    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    Ok((dir, file_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_absolute_paths_at_the_file_name() {
        let tmp = tempfile::TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = tmp.path().join("artifact.json");
        let path_str = path
            .to_str()
            .unwrap_or_else(|| panic!("temp path should be utf8"))
            .to_owned();

        let (dir, file_path) = open_parent_dir(&path_str)
            .unwrap_or_else(|message| panic!("open parent: {message}"));
        assert_eq!(file_path, Utf8Path::new("artifact.json"));

        dir.write(file_path, "{}")
            .unwrap_or_else(|err| panic!("write through handle: {err}"));
        let written = std::fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("read back: {err}"));
        assert_eq!(written, "{}");
    }

    #[test]
    fn keeps_relative_paths_intact() {
        let (_dir, file_path) = open_parent_dir("artifact.json")
            .unwrap_or_else(|message| panic!("open parent: {message}"));
        assert_eq!(file_path, Utf8Path::new("artifact.json"));
    }

    #[test]
    fn rejects_the_filesystem_root() {
        let message = open_parent_dir("/").expect_err("root has no parent");
        assert!(
            message.contains("no parent directory"),
            "message: {message}"
        );
    }

    #[test]
    fn reports_missing_directories() {
        let message = open_parent_dir("/definitely/not/a/dir/artifact.json")
            .expect_err("missing directory must fail");
        assert!(!message.is_empty());
    }
}
