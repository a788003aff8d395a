//! File-backed storage: one file per key inside a directory.
//!
//! Each write goes to a temporary file that is renamed over the old value
//! while holding an exclusive lock on `.lock`, so readers only ever see a
//! complete value.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::{check_key, Storage, StorageError};

const LOCK_FILE: &str = ".lock";

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.dir.join(key))
    }

    fn lock(&self, key: &str) -> Result<File, StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io {
            key: key.to_string(),
            source,
        };
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))
            .map_err(io_err)?;
        lock.lock_exclusive().map_err(io_err)?;
        Ok(lock)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        let tmp_path = path.with_extension("tmp");
        let io_err = |source: std::io::Error| StorageError::Io {
            key: key.to_string(),
            source,
        };

        // Lock is released when dropped
        let _lock = self.lock(key)?;

        let mut tmp = File::create(&tmp_path).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.sync_all().map_err(io_err)?;
        drop(tmp);

        fs::rename(&tmp_path, &path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("storage");

        let mut storage = FileStorage::open(&dir).unwrap();
        storage.set("content", "[]").unwrap();
        storage.set("theme", "dark").unwrap();

        let reopened = FileStorage::open(&dir).unwrap();
        assert_eq!(reopened.get("content").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn test_overwrite_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path()).unwrap();

        storage.set("content", "[1]").unwrap();
        storage.set("content", "[1,2]").unwrap();

        assert_eq!(storage.get("content").unwrap().as_deref(), Some("[1,2]"));
        assert!(!temp.path().join("content.tmp").exists());
    }

    #[test]
    fn test_invalid_keys() {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(temp.path()).unwrap();

        assert!(storage.get("a b").is_err());
        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
