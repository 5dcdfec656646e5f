//! JSON file helpers shared by the file-backed repositories.
//!
//! # Invariants
//! - Writes go to a sibling temp file that is renamed over the target, so a
//!   reader sees either the old or the new document, never a partial one.
//! - Unreadable documents are copied aside before an error is reported.

use crate::repo::task_repo::{RepoError, RepoResult};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Reads and decodes a JSON document.
///
/// Returns `Ok(None)` when the file does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> RepoResult<Option<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(RepoError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| RepoError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Encodes `value` as pretty JSON and atomically replaces `path`.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> RepoResult<()> {
    let io_err = |source: std::io::Error| RepoError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let text = serde_json::to_string_pretty(value).map_err(|source| RepoError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path(path);
    let mut file = File::create(&tmp).map_err(io_err)?;
    file.write_all(text.as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(source));
    }
    Ok(())
}

/// Copies an unreadable document to `<file>.corrupt` for manual inspection.
///
/// Returns the backup path, or `None` when the copy itself failed.
pub(crate) fn quarantine(path: &Path) -> Option<PathBuf> {
    let backup = sibling_with_suffix(path, "corrupt");
    match fs::copy(path, &backup) {
        Ok(_) => {
            info!(
                "event=storage_quarantine module=repo status=ok backup={}",
                backup.display()
            );
            Some(backup)
        }
        Err(err) => {
            warn!(
                "event=storage_quarantine module=repo status=error path={} error={}",
                path.display(),
                err
            );
            None
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "tmp")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        write_json_atomic(&path, &vec!["a", "b"]).unwrap();

        let loaded: Option<Vec<String>> = read_json(&path).unwrap();
        assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<Vec<String>> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn quarantine_copies_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{not json").unwrap();

        let backup = quarantine(&path).unwrap();
        assert_eq!(backup, dir.path().join("tasks.json.corrupt"));
        assert_eq!(fs::read_to_string(backup).unwrap(), "{not json");
    }
}
