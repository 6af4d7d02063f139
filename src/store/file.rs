//! Directory-backed store.

use std::{fs, io, path::PathBuf};

use crate::store::{KeyValueStore, StoreError};

/// A store keeping one file per key under a base directory.
///
/// Stands in for a durable backend without touching the engine: the
/// aggregates only see [`KeyValueStore`]. Keys use `:` as a scope separator,
/// which is mapped to `+` in file names.
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys come from `store::keys` and only use `:` outside the
        // identifier alphabet.
        self.root.join(key.replace(':', "+"))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::write(self.path_for(key), value)?;

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn values_survive_reopen() -> TestResult {
        let dir = tempfile::tempdir()?;

        {
            let mut store = DirStore::open(dir.path())?;
            store.set("wallet:u1", r#"{"balance":5000}"#)?;
        }

        let store = DirStore::open(dir.path())?;
        assert_eq!(store.get("wallet:u1")?, Some(r#"{"balance":5000}"#.to_owned()));

        Ok(())
    }

    #[test]
    fn missing_and_removed_keys_read_as_absent() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut store = DirStore::open(dir.path())?;

        assert_eq!(store.get("cart")?, None);

        store.set("cart", "[]")?;
        store.remove("cart")?;
        store.remove("cart")?;

        assert_eq!(store.get("cart")?, None);

        Ok(())
    }

    #[test]
    fn scoped_keys_do_not_collide() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut store = DirStore::open(dir.path())?;

        store.set("orders:u1", "[1]")?;
        store.set("orders:u2", "[2]")?;

        assert_eq!(store.get("orders:u1")?, Some("[1]".to_owned()));
        assert_eq!(store.get("orders:u2")?, Some("[2]".to_owned()));

        Ok(())
    }
}
