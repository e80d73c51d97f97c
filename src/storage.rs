//! Persistent configuration storage lifecycle.
//!
//! The Matter stack keeps fabrics, sessions and attribute values in a
//! key-value store that has to be brought up before anything else. This
//! module only owns that store's lifecycle: `init`, and `erase` when the
//! content cannot be used (full, written by a newer format, or corrupted).
//!
//! `FileStorage` is the host implementation: one JSON document with a format
//! version and the raw entries, kept under the configured storage directory.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Format version written by this build.
pub const STORE_VERSION: u32 = 1;

const STORE_FILE: &str = "nvs.json";

/// Size above which the store is considered full.
const MAX_STORE_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no free pages left in configuration store")]
    NoFreePages,

    #[error("configuration store has format version {found}, expected {expected}")]
    NewVersionFound { found: u32, expected: u32 },

    #[error("configuration store is corrupted: {0}")]
    Corrupted(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Whether erasing the store and initializing again can fix this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoFreePages | Self::NewVersionFound { .. } | Self::Corrupted(_)
        )
    }
}

/// Lifecycle of the persistent configuration store.
pub trait ConfigStorage: Send {
    fn init(&mut self) -> Result<(), StorageError>;
    fn erase(&mut self) -> Result<(), StorageError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreImage {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

impl StoreImage {
    fn empty() -> Self {
        Self {
            version: STORE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// JSON file backed configuration store.
pub struct FileStorage {
    dir: PathBuf,
    image: Option<StoreImage>,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            image: None,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    pub fn is_initialized(&self) -> bool {
        self.image.is_some()
    }

    /// Number of entries held by the store, 0 before `init`.
    pub fn len(&self) -> usize {
        self.image.as_ref().map_or(0, |image| image.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(path: &Path) -> Result<StoreImage, StorageError> {
        let bytes = fs::read(path)?;
        if bytes.len() > MAX_STORE_BYTES {
            return Err(StorageError::NoFreePages);
        }
        let image: StoreImage =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupted(e.to_string()))?;
        if image.version != STORE_VERSION {
            return Err(StorageError::NewVersionFound {
                found: image.version,
                expected: STORE_VERSION,
            });
        }
        Ok(image)
    }

    fn create(path: &Path) -> Result<StoreImage, StorageError> {
        let image = StoreImage::empty();
        let data = serde_json::to_vec_pretty(&image)
            .map_err(|e| StorageError::Corrupted(e.to_string()))?;
        fs::write(path, data)?;
        Ok(image)
    }
}

impl ConfigStorage for FileStorage {
    fn init(&mut self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();

        let image = match Self::load(&path) {
            Ok(image) => {
                info!(
                    "[Storage] Loaded {} entries from {:?}",
                    image.entries.len(),
                    path
                );
                image
            }
            Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("[Storage] No store at {:?} (first run), creating", path);
                Self::create(&path)?
            }
            Err(e) => return Err(e),
        };

        self.image = Some(image);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        self.image = None;
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                warn!("[Storage] Erased {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
