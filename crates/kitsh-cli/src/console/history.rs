//! Plain-text console history persisted between sessions.
//!
//! The file holds one entry per line, oldest first. It is read once when a
//! session starts and rewritten once when it ends; no handle is held open in
//! between.

use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures while reading or writing the history file.
#[derive(Debug, Error)]
pub(crate) enum HistoryError {
    #[error("failed to read history from {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write history to {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Location of the history file, or `None` when persistence is disabled.
#[derive(Debug, Clone, Default)]
pub(crate) struct HistoryStore {
    path: Option<PathBuf>,
}

impl HistoryStore {
    pub(crate) const fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads every stored entry. A missing file is an empty history.
    pub(crate) fn load(&self) -> Result<Vec<String>, HistoryError> {
        let Some(path) = self.path() else {
            return Ok(Vec::new());
        };
        let read_error = |source| HistoryError::Read {
            path: path.to_path_buf(),
            source,
        };
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(read_error(error)),
        };
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(read_error)?;
            if !line.is_empty() {
                entries.push(line);
            }
        }
        Ok(entries)
    }

    /// Replaces the file contents with `entries`.
    pub(crate) fn save(&self, entries: &[String]) -> Result<(), HistoryError> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let write_error = |source| HistoryError::Write {
            path: path.to_path_buf(),
            source,
        };
        let file = fs::File::create(path).map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        for entry in entries {
            writeln!(writer, "{entry}").map_err(write_error)?;
        }
        writer.flush().map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_history() {
        let dir = TempDir::new().expect("temp dir");
        let store = HistoryStore::new(Some(dir.path().join("absent")));
        assert!(store.load().expect("load succeeds").is_empty());
    }

    #[test]
    fn saved_entries_load_in_order() {
        let dir = TempDir::new().expect("temp dir");
        let store = HistoryStore::new(Some(dir.path().join("history")));
        let entries = vec![String::from("img list"), String::from("vm list")];
        store.save(&entries).expect("save succeeds");
        assert_eq!(store.load().expect("load succeeds"), entries);
    }

    #[test]
    fn disabled_store_ignores_io() {
        let store = HistoryStore::default();
        store
            .save(&[String::from("ignored")])
            .expect("save is a no-op");
        assert!(store.load().expect("load is a no-op").is_empty());
    }

    #[test]
    fn unreadable_location_reports_path() {
        let dir = TempDir::new().expect("temp dir");
        let store = HistoryStore::new(Some(dir.path().to_path_buf()));
        let error = store
            .save(&[String::from("entry")])
            .expect_err("directory cannot be written as a file");
        assert!(error.to_string().contains(&dir.path().display().to_string()));
    }
}
