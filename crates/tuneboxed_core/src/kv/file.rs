//! Directory-backed key-value store: one `<key>.json` file per key.

use super::{validate_key, KeyValueStore, KvResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Uses `dir` as the store root, creating it if missing.
    pub fn open(dir: impl Into<PathBuf>) -> KvResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> KvResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let path = self.path_for(key)?;
        // Write beside the target so the rename stays on one filesystem.
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(value.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|err| err.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FileKeyValueStore;
    use crate::kv::KeyValueStore;

    #[test]
    fn set_get_remove_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path().join("kv")).unwrap();

        assert_eq!(store.get("users").unwrap(), None);
        store.set("users", "[]").unwrap();
        assert_eq!(store.get("users").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("kv").join("users.json").exists());

        store.remove("users").unwrap();
        store.remove("users").unwrap();
        assert_eq!(store.get("users").unwrap(), None);
    }

    #[test]
    fn set_replaces_whole_value_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path()).unwrap();
        store.set("pageviews", "[1,2,3]").unwrap();
        store.set("pageviews", "[4]").unwrap();

        let reopened = FileKeyValueStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("pageviews").unwrap().as_deref(), Some("[4]"));
    }
}
