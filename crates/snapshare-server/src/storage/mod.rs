//! Binary asset storage.
//!
//! Trait-based abstraction over where uploaded photo bytes live. The trait is
//! synchronous; stores are small and the runtime calls them outside the
//! engine lock.

mod disk;
mod error;
mod memory;

pub use disk::DiskAssetStore;
pub use error::StorageError;
pub use memory::MemoryAssetStore;

/// Storage for uploaded asset bytes, keyed by stored file name.
///
/// Must be Clone (shared between connection tasks) and Send + Sync.
/// Implementations share internal state, so clones see the same assets.
pub trait AssetStore: Clone + Send + Sync + 'static {
    /// Store `bytes` under `name`.
    ///
    /// # Invariants
    ///
    /// - Pre: `name` is a single path component (no separators, not `.`/`..`)
    /// - Post: a later `load(name)` returns exactly `bytes`
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidName` if `name` is not a plain file name
    /// - `StorageError::AlreadyExists` if `name` is taken
    /// - `StorageError::Io` on backend failure
    fn store(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Load the bytes stored under `name`. `None` if absent.
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Number of stored assets.
    fn asset_count(&self) -> Result<usize, StorageError>;
}

/// Reject names that could escape the store's namespace.
pub(crate) fn check_name(name: &str) -> Result<(), StorageError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);

    if bad { Err(StorageError::InvalidName(name.to_string())) } else { Ok(()) }
}
