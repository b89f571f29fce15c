#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use bytes::Bytes;

use super::{AssetStore, StorageError, check_name};

/// In-memory asset store for tests, simulation and ephemeral servers.
///
/// State lives behind `Arc<Mutex<_>>` so clones share it. A poisoned mutex is
/// reported as `StorageError::Io`.
#[derive(Clone, Default)]
pub struct MemoryAssetStore {
    inner: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryAssetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Bytes>>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Io("asset store mutex poisoned".to_string()))
    }

    /// Stored names, sorted.
    pub fn names(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<_> = self.lock()?.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }
}

impl AssetStore for MemoryAssetStore {
    fn store(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        check_name(name)?;

        let mut assets = self.lock()?;
        if assets.contains_key(name) {
            return Err(StorageError::AlreadyExists(name.to_string()));
        }
        assets.insert(name.to_string(), Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_name(name)?;
        Ok(self.lock()?.get(name).map(|b| b.to_vec()))
    }

    fn asset_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.len())
    }
}
