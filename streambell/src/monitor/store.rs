//! Durable subscription status storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Persisted map of subscription id to notified-live flag.
///
/// `true` means the most recent notification sent for that subscription was
/// the live variant and no offline notification has followed it. An entry
/// exists once a poll has observed the subscription and the record was
/// persisted.
#[derive(Debug)]
pub struct StatusStore {
    path: PathBuf,
    entries: BTreeMap<String, bool>,
}

impl StatusStore {
    /// Load the store from disk.
    ///
    /// A missing file is a fresh start. A corrupt or unreadable file is
    /// logged and treated as empty rather than aborting startup; the next
    /// persisted mutation rewrites it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, bool>>(&bytes) {
                Ok(entries) => {
                    debug!(
                        path = %path.display(),
                        entries = entries.len(),
                        "Loaded status store"
                    );
                    entries
                }
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Corrupt status file; starting with empty state"
                    );
                    BTreeMap::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Could not read status file; starting with empty state"
                );
                BTreeMap::new()
            }
        };

        Self { path, entries }
    }

    /// Last recorded notified-live flag for a subscription, if any poll has
    /// stored one.
    pub fn get(&self, id: &str) -> Option<bool> {
        self.entries.get(id).copied()
    }

    /// Record a flag and synchronously rewrite the file.
    pub fn set(&mut self, id: &str, notified_live: bool) -> Result<()> {
        self.entries.insert(id.to_string(), notified_live);
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whole file as pretty-printed JSON.
    ///
    /// Writes to a `.tmp` sibling and renames it over the target, so a crash
    /// mid-write leaves the previous file intact.
    fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io_path("creating state directory", parent, e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, &json).map_err(|e| Error::io_path("writing state file", &tmp, e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::io_path("replacing state file", &self.path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatusStore::load(dir.path().join("state.json"));
        assert!(store.is_empty());
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = StatusStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StatusStore::load(&path);
        store.set("a", true).unwrap();
        store.set("b", false).unwrap();

        let reloaded = StatusStore::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("a"), Some(true));
        assert_eq!(reloaded.get("b"), Some(false));
    }

    #[test]
    fn test_set_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StatusStore::load(&path);
        store.set("a", true).unwrap();
        assert_eq!(StatusStore::load(&path).get("a"), Some(true));

        store.set("a", false).unwrap();
        assert_eq!(StatusStore::load(&path).get("a"), Some(false));
    }

    #[test]
    fn test_file_is_pretty_printed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StatusStore::load(&path);
        store.set("a", true).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\n"));
        assert!(contents.contains("\"a\": true"));
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = StatusStore::load(&path);
        store.set("a", true).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StatusStore::load(&path);
        store.set("a", true).unwrap();
        assert!(!dir.path().join("state.json.tmp").exists());
    }
}
