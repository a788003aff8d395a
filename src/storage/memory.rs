//! In-memory storage, used by tests and throwaway sessions.

use std::collections::HashMap;

use super::{check_key, Storage, StorageError};

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing any encoding
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        check_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("theme").unwrap(), None);

        storage.set("theme", "dark").unwrap();
        assert_eq!(storage.get("theme").unwrap().as_deref(), Some("dark"));

        storage.set("theme", "light").unwrap();
        assert_eq!(storage.get("theme").unwrap().as_deref(), Some("light"));
        assert!(storage.get("../theme").is_err());
    }
}
