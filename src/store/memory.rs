//! In-memory store.

use std::io;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::store::{KeyValueStore, StoreError};

/// A store backed by a process-local map.
///
/// The default backend for tests and demos. Writes to keys registered via
/// [`MemoryStore::fail_writes_to`] fail with an IO error, which lets tests
/// exercise the not-committed paths without a real quota failure.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: FxHashMap<String, String>,
    failing_keys: FxHashSet<String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write (set or remove) of `key` fail.
    pub fn fail_writes_to(&mut self, key: impl Into<String>) {
        self.failing_keys.insert(key.into());
    }

    /// Writes to `key` succeed again.
    pub fn allow_writes_to(&mut self, key: &str) {
        self.failing_keys.remove(key);
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        if self.failing_keys.contains(key) {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::StorageFull,
                format!("write to {key} rejected"),
            )));
        }

        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.values.insert(key.to_owned(), value.to_owned());

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.values.remove(key);

        Ok(())
    }
}
