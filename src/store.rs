//! # Marker Store
//!
//! In-memory marker list mirrored to a single key-value slot.
//!
//! Every mutation rewrites the whole serialized list under
//! [`StoreConfig::storage_key`]. There are no partial updates and no
//! versioning: a payload that cannot be parsed loads as an empty list.
//!
//! Because an empty fallback is indistinguishable from "no markers yet", the
//! store remembers why it came up empty ([`LoadOutcome`]) and, when
//! [`StoreConfig::backup_key`] is set, copies an unreadable payload aside before
//! the next write can overwrite it.
//!
//! ## Backends
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`MemoryKeyValueStore`] | Tests, hosts that persist through FFI |
//! | [`FileKeyValueStore`] | One file per key in an app data directory |
//!
//! ## Example
//!
//! ```rust
//! use activity_markers::{GpsPoint, MarkerRecord, MarkerStore, MemoryKeyValueStore};
//!
//! let mut store = MarkerStore::open(MemoryKeyValueStore::new());
//! store.append(MarkerRecord::with_default_icon(GpsPoint::new(52.52, 13.405), "Work", "Office", "High")).unwrap();
//!
//! // Reopening from the same backend sees the persisted list
//! let store = MarkerStore::open(store.into_backend());
//! assert_eq!(store.len(), 1);
//! ```
//!
//! The store is single-writer. It does no locking; wrap it in a mutex if more
//! than one thread needs it.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::error::StoreError;
use crate::markers::{encode_markers, try_decode_markers};
use crate::nearest::{find_nearest, NearestMarker};
use crate::{GpsPoint, MarkerRecord};

/// Key the marker list is stored under by default.
pub const DEFAULT_STORAGE_KEY: &str = "markers_list";

// ============================================================================
// Key-value backends
// ============================================================================

/// A persistence layer of named string slots.
pub trait KeyValueStore {
    /// Read the value under `key`, or `None` if nothing is stored.
    fn load(&self, key: &str) -> Option<String>;

    /// Replace the value under `key`.
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// HashMap-backed store.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `value` already stored under `key`.
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_string(), value.to_string());
        Self { values }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Directory-backed store: each key is a `<key>.json` file.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so readers see either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Use `root` as the storage directory, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn load(&self, key: &str) -> Option<String> {
        let path = match self.path_for(key) {
            Ok(p) => p,
            Err(e) => {
                warn!("[FileKeyValueStore] {}", e);
                return None;
            }
        };
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("[FileKeyValueStore] Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!("[FileKeyValueStore] Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Marker store
// ============================================================================

/// Configuration for [`MarkerStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Slot holding the serialized marker list.
    /// Default: "markers_list"
    pub storage_key: String,

    /// Slot an unreadable payload is copied to before it can be overwritten.
    /// `None` disables the copy. Default: "markers_list.corrupt"
    pub backup_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            backup_key: Some(format!("{}.corrupt", DEFAULT_STORAGE_KEY)),
        }
    }
}

/// What the last load found in the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing was stored
    Missing,
    /// Payload parsed
    Loaded { count: usize },
    /// Payload was present but unreadable; the store started empty
    Malformed { reason: String },
}

/// Ordered marker list persisted as one blob.
#[derive(Debug)]
pub struct MarkerStore<S: KeyValueStore> {
    backend: S,
    config: StoreConfig,
    records: Vec<MarkerRecord>,
    load_outcome: LoadOutcome,
}

impl<S: KeyValueStore> MarkerStore<S> {
    /// Load the marker list from `backend` using the default configuration.
    pub fn open(backend: S) -> Self {
        Self::open_with_config(backend, StoreConfig::default())
    }

    /// Load the marker list from `backend`.
    ///
    /// Never fails: a missing or unreadable payload gives an empty store. Check
    /// [`load_outcome`](Self::load_outcome) to tell the two apart.
    pub fn open_with_config(backend: S, config: StoreConfig) -> Self {
        let mut store = Self {
            backend,
            config,
            records: Vec::new(),
            load_outcome: LoadOutcome::Missing,
        };
        store.reload();
        store
    }

    /// Discard the in-memory list and read it again from the backend.
    pub fn reload(&mut self) -> &LoadOutcome {
        let raw = self.backend.load(&self.config.storage_key);

        let (records, outcome) = match raw {
            None => (Vec::new(), LoadOutcome::Missing),
            Some(raw) => match try_decode_markers(&raw) {
                Ok(records) => {
                    let count = records.len();
                    (records, LoadOutcome::Loaded { count })
                }
                Err(e) => {
                    warn!(
                        "[MarkerStore] Stored marker list under '{}' is unreadable, starting empty: {}",
                        self.config.storage_key, e
                    );
                    self.backup_payload(&raw);
                    (Vec::new(), LoadOutcome::Malformed { reason: e.to_string() })
                }
            },
        };

        info!("[MarkerStore] Loaded {} markers ({:?})", records.len(), outcome);
        self.records = records;
        self.load_outcome = outcome;
        &self.load_outcome
    }

    fn backup_payload(&mut self, raw: &str) {
        let Some(backup_key) = self.config.backup_key.clone() else {
            return;
        };
        match self.backend.save(&backup_key, raw) {
            Ok(()) => info!("[MarkerStore] Copied unreadable payload to '{}'", backup_key),
            Err(e) => error!("[MarkerStore] Failed to back up unreadable payload: {}", e),
        }
    }

    /// All records in insertion order.
    pub fn all(&self) -> &[MarkerRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&MarkerRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// How the current contents were obtained.
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    /// Closest record to `query`; ties go to the earliest record.
    pub fn nearest(&self, query: &GpsPoint) -> Option<NearestMarker<'_>> {
        find_nearest(query, &self.records)
    }

    /// Append a record and persist the full list.
    ///
    /// A record with a NaN or infinite coordinate is rejected before anything
    /// changes, so the stored list stays readable. Otherwise the record stays
    /// in memory even if persisting fails.
    pub fn append(&mut self, record: MarkerRecord) -> Result<(), StoreError> {
        if !record.position.is_finite() {
            warn!(
                "[MarkerStore] Refusing '{}' with non-finite position ({}, {})",
                record.title(),
                record.position.latitude,
                record.position.longitude
            );
            return Err(StoreError::NonFiniteCoordinate {
                index: self.records.len(),
                latitude: record.position.latitude,
                longitude: record.position.longitude,
            });
        }
        debug!("[MarkerStore] Appending '{}'", record.title());
        self.records.push(record);
        self.persist()
    }

    /// Remove the record at `index` and persist the full list.
    ///
    /// Returns `Ok(None)` without writing if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Result<Option<MarkerRecord>, StoreError> {
        if index >= self.records.len() {
            return Ok(None);
        }
        let removed = self.records.remove(index);
        debug!("[MarkerStore] Removed '{}' at {}", removed.title(), index);
        self.persist()?;
        Ok(Some(removed))
    }

    /// Remove the first record equal to `record` and persist the full list.
    pub fn remove_record(&mut self, record: &MarkerRecord) -> Result<Option<MarkerRecord>, StoreError> {
        match self.records.iter().position(|r| r == record) {
            Some(index) => self.remove(index),
            None => Ok(None),
        }
    }

    /// Drop every record and delete the stored slot.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        self.backend.remove(&self.config.storage_key)?;
        info!("[MarkerStore] Cleared all saved markers");
        Ok(())
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let json = encode_markers(&self.records)?;
        match self.backend.save(&self.config.storage_key, &json) {
            Ok(()) => {
                debug!("[MarkerStore] Saved {} markers", self.records.len());
                Ok(())
            }
            Err(e) => {
                error!("[MarkerStore] Failed to save {} markers: {}", self.records.len(), e);
                Err(e)
            }
        }
    }
}
