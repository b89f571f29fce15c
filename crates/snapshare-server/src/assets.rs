//! Asset intake: validate an upload, store it, hand back a reference.
//!
//! Sits in front of the engine's publish path. Rejected uploads never reach
//! the engine; the runtime replies to the uploader directly.
//!
//! Acceptance rules:
//!
//! - the payload is non-empty and at most [`AssetConfig::max_bytes`]
//! - the file-name extension (case-insensitive) is whitelisted
//! - the declared MIME type is `image/<subtype>` with a whitelisted subtype
//!
//! Stored names are `<unix-millis>-<random below 1e9>.<ext>`; the reference
//! handed to the engine is `/uploads/<stored name>`.

use snapshare_core::env::Environment;
use snapshare_proto::payloads::content::AssetUpload;
use thiserror::Error;

use crate::storage::{AssetStore, StorageError};

/// Default upload ceiling (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Path prefix of asset references.
pub const ASSET_REF_PREFIX: &str = "/uploads/";

const NAME_ATTEMPTS: usize = 4;

/// Upload acceptance configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetConfig {
    /// Largest accepted upload in bytes
    pub max_bytes: usize,
    /// Accepted image types, lowercase (`jpeg`, `png`, ...)
    pub allowed_types: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_types: ["jpeg", "jpg", "png", "gif"].map(String::from).to_vec(),
        }
    }
}

/// Reasons an upload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// Empty payload
    #[error("no file uploaded")]
    Missing,

    /// Payload above the ceiling
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge {
        /// Upload size
        size: usize,
        /// Ceiling
        max: usize,
    },

    /// Extension or MIME type not whitelisted
    #[error("only image files are allowed (got {file_name:?} as {mime_type:?})")]
    UnsupportedType {
        /// Client file name
        file_name: String,
        /// Declared MIME type
        mime_type: String,
    },

    /// Backend failed to store the bytes
    #[error("failed to store upload: {0}")]
    Storage(#[from] StorageError),
}

/// An upload that passed validation and was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Name inside the store
    pub name: String,
    /// Reference handed to the engine, `/uploads/<name>`
    pub asset_ref: String,
}

/// Validates uploads and writes them to an [`AssetStore`].
#[derive(Clone)]
pub struct AssetIntake<S, E> {
    config: AssetConfig,
    store: S,
    env: E,
}

impl<S, E> AssetIntake<S, E>
where
    S: AssetStore,
    E: Environment,
{
    /// Create an intake over `store`.
    pub fn new(config: AssetConfig, store: S, env: E) -> Self {
        Self { config, store, env }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Acceptance configuration.
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Check an upload without storing it. Returns the normalised extension.
    ///
    /// # Errors
    ///
    /// - `AssetError::Missing`, `AssetError::TooLarge` or
    ///   `AssetError::UnsupportedType` per the module rules
    pub fn validate(&self, upload: &AssetUpload) -> Result<String, AssetError> {
        if upload.bytes.is_empty() {
            return Err(AssetError::Missing);
        }

        if upload.bytes.len() > self.config.max_bytes {
            return Err(AssetError::TooLarge {
                size: upload.bytes.len(),
                max: self.config.max_bytes,
            });
        }

        let unsupported = || AssetError::UnsupportedType {
            file_name: upload.file_name.clone(),
            mime_type: upload.mime_type.clone(),
        };

        let extension = upload
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| self.is_allowed(ext))
            .ok_or_else(unsupported)?;

        let mime = upload.mime_type.trim().to_ascii_lowercase();
        let subtype_ok = mime.strip_prefix("image/").is_some_and(|sub| self.is_allowed(sub));
        if !subtype_ok {
            return Err(unsupported());
        }

        Ok(extension)
    }

    fn is_allowed(&self, kind: &str) -> bool {
        self.config.allowed_types.iter().any(|allowed| allowed == kind)
    }

    /// Validate and store an upload.
    ///
    /// # Errors
    ///
    /// - Any error from [`Self::validate`]
    /// - `AssetError::Storage` if the store fails, or every generated name
    ///   collided
    pub fn accept(&self, upload: &AssetUpload) -> Result<StoredAsset, AssetError> {
        let extension = self.validate(upload)?;

        let mut last_error = None;
        for _ in 0..NAME_ATTEMPTS {
            let name = self.generate_name(&extension);
            match self.store.store(&name, &upload.bytes) {
                Ok(()) => {
                    let asset_ref = format!("{ASSET_REF_PREFIX}{name}");
                    return Ok(StoredAsset { name, asset_ref });
                },
                Err(e @ StorageError::AlreadyExists(_)) => last_error = Some(e),
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_error.map_or_else(
            || AssetError::Storage(StorageError::Io("no name attempts made".to_string())),
            AssetError::Storage,
        ))
    }

    fn generate_name(&self, extension: &str) -> String {
        let millis = self.env.wall_clock_millis();
        let suffix = self.env.random_u64() % 1_000_000_000;
        format!("{millis}-{suffix}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::storage::MemoryAssetStore;

    #[derive(Clone)]
    struct FixedEnv;

    impl Environment for FixedEnv {
        type Instant = std::time::Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Self::Instant {
            std::time::Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            std::future::ready(())
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
            if let Some(last) = buffer.last_mut() {
                *last = 42;
            }
        }

        fn wall_clock_millis(&self) -> u64 {
            1_700_000_000_000
        }
    }

    fn intake() -> AssetIntake<MemoryAssetStore, FixedEnv> {
        AssetIntake::new(AssetConfig::default(), MemoryAssetStore::new(), FixedEnv)
    }

    fn upload(file_name: &str, mime_type: &str, len: usize) -> AssetUpload {
        AssetUpload {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes: vec![7u8; len],
        }
    }

    #[test]
    fn accepts_whitelisted_images() {
        let intake = intake();

        let stored = intake.accept(&upload("Cat.PNG", "image/png", 10)).unwrap();

        assert_eq!(stored.name, "1700000000000-42.png");
        assert_eq!(stored.asset_ref, "/uploads/1700000000000-42.png");
        assert_eq!(intake.store().load(&stored.name).unwrap(), Some(vec![7u8; 10]));
    }

    #[test]
    fn rejects_empty_upload() {
        assert_eq!(intake().accept(&upload("a.png", "image/png", 0)), Err(AssetError::Missing));
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        let intake = intake();
        assert!(intake.validate(&upload("a.gif", "image/gif", DEFAULT_MAX_UPLOAD_BYTES)).is_ok());
        assert_eq!(
            intake.validate(&upload("a.gif", "image/gif", DEFAULT_MAX_UPLOAD_BYTES + 1)),
            Err(AssetError::TooLarge {
                size: DEFAULT_MAX_UPLOAD_BYTES + 1,
                max: DEFAULT_MAX_UPLOAD_BYTES,
            })
        );
    }

    #[test]
    fn rejects_wrong_extension_or_mime() {
        let intake = intake();
        for (name, mime) in [
            ("notes.txt", "image/png"),
            ("photo", "image/png"),
            ("photo.png", "text/plain"),
            ("photo.png", "application/png"),
            ("photo.bmp", "image/bmp"),
        ] {
            assert!(
                matches!(intake.validate(&upload(name, mime, 4)), Err(AssetError::UnsupportedType { .. })),
                "{name} as {mime} should be rejected"
            );
        }
        assert_eq!(intake.store().asset_count().unwrap(), 0);
    }

    #[test]
    fn name_collisions_surface_as_storage_errors() {
        let intake = intake();
        intake.accept(&upload("a.jpg", "image/jpeg", 3)).unwrap();

        let result = intake.accept(&upload("b.jpg", "image/jpeg", 3));

        assert!(matches!(result, Err(AssetError::Storage(StorageError::AlreadyExists(_)))));
    }
}
