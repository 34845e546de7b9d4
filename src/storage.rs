//! Local key-value storage and the persisted cart projection.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::products::ProductId;

/// Key holding the persisted cart.
pub const CART_KEY: &str = "cart";

/// Errors raised by local storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    /// Stored value could not be (de)serialized.
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Key contains characters the backend cannot store.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// In-memory store lock was poisoned.
    #[error("storage lock poisoned: {0}")]
    Poisoned(String),
}

/// String key-value store, the local persistence substrate.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut FxHashMap<String, String>) -> T,
    ) -> Result<T, StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| StorageError::Poisoned(error.to_string()))?;

        Ok(f(&mut entries))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}

/// Store keeping one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        Ok(Self { root })
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        let tmp = path.with_extension("json.tmp");

        // Readers only ever see a complete value.
        let result = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, &path));

        if result.is_err() {
            _ = fs::remove_file(&tmp);
        }

        result.map_err(StorageError::from)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Minimal cart projection kept in local storage and sent to the remote cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCartEntry {
    /// Product identifier
    pub product_id: ProductId,

    /// Quantity
    pub quantity: u32,
}

impl PersistedCartEntry {
    /// Create an entry.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Reads and writes the persisted cart under [`CART_KEY`].
#[derive(Debug, Clone)]
pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
}

impl CartStore {
    /// Wrap a key-value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the persisted entries; a missing key is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store cannot be read or holds invalid JSON.
    pub fn load(&self) -> Result<Vec<PersistedCartEntry>, StorageError> {
        match self.store.get(CART_KEY)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            Some(_) | None => Ok(Vec::new()),
        }
    }

    /// Replace the persisted entries.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the entries cannot be written.
    pub fn save(&self, entries: &[PersistedCartEntry]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(entries)?;

        self.store.set(CART_KEY, &raw)
    }
}
