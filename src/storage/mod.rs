//! Key-value storage backing the library.
//!
//! A [`Storage`] holds whole string values under short keys, the way a
//! browser's local storage does. Writes replace the full value; there are no
//! partial updates and no transactions.
//!
//! # Layout
//!
//! ```text
//! ~/.learnshelf/
//! ├── storage/
//! │   ├── .lock          # advisory write lock
//! │   ├── content        # JSON array of content records, display order
//! │   └── theme          # light | dark
//! └── blobs/             # PDF copies referenced as blob:<name>
//! ```

pub mod file;
pub mod memory;

use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors from a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Whole-value key-value storage
pub trait Storage {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Keys are plain names: ASCII letters, digits, `-` and `_`
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
