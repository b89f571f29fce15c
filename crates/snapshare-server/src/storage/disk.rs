//! Directory-backed asset store.
//!
//! One file per asset inside a single upload directory. Files are created
//! with `create_new`, so an existing asset is never overwritten.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use super::{AssetStore, StorageError, check_name};

/// Asset store writing into a directory on disk.
///
/// Clone is cheap (Arc).
#[derive(Clone, Debug)]
pub struct DiskAssetStore {
    root: Arc<PathBuf>,
}

impl DiskAssetStore {
    /// Open the upload directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| StorageError::Io(format!("{}: {e}", root.display())))?;
        Ok(Self { root: Arc::new(root) })
    }

    /// Upload directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        check_name(name)?;
        Ok(self.root.join(name))
    }
}

impl AssetStore for DiskAssetStore {
    fn store(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(name)?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(name.to_string()));
            },
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_all()) {
            let _ = fs::remove_file(&path);
            return Err(StorageError::Io(e.to_string()));
        }

        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(name)?;
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn asset_count(&self) -> Result<usize, StorageError> {
        let entries = fs::read_dir(self.root.as_path()).map_err(|e| StorageError::Io(e.to_string()))?;
        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::Io(e.to_string()))?;
            if entry.file_type().map_err(|e| StorageError::Io(e.to_string()))?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}
