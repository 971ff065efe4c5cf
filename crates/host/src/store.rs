//! Best-score persistence.
//!
//! The best score is one integer string (raw ticks) under a fixed key in a
//! string key-value store. Reads that fail or do not parse degrade to zero;
//! writes that fail are logged and ignored. The session keeps playing either
//! way.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use runner_sim::Tick;
use thiserror::Error;

/// Storage key for the persisted best score.
pub const BEST_SCORE_KEY: &str = "dinoHiScore";

/// Key-value store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// String key-value storage, in the shape of the browser's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

// ============================================================================
// Stores
// ============================================================================

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON object of string values in one file.
///
/// A missing file reads as empty. Every `set` rewrites the whole file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&map).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(io_err)
    }
}

// ============================================================================
// Best Score
// ============================================================================

/// The persisted best score, cached after one read at construction.
#[derive(Debug)]
pub struct BestScore<S> {
    store: S,
    key: String,
    best_ticks: Tick,
}

impl<S: KeyValueStore> BestScore<S> {
    /// Read the persisted value once. Anything unreadable counts as zero.
    pub fn load(store: S, key: &str) -> Self {
        let best_ticks = match store.get(key) {
            Ok(Some(raw)) => parse_ticks(&raw).unwrap_or_else(|| {
                warn!("ignoring unparsable best score {raw:?} under {key}");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!("best score unavailable, starting from 0: {e}");
                0
            }
        };
        debug!("loaded best score {best_ticks} ticks from {key}");

        Self {
            store,
            key: key.to_string(),
            best_ticks,
        }
    }

    pub fn best_ticks(&self) -> Tick {
        self.best_ticks
    }

    /// Persist `ticks` if it beats the cached best. Returns whether it did.
    ///
    /// The cached value still advances when the write fails, so the value
    /// reported to the player never decreases.
    pub fn record(&mut self, ticks: Tick) -> bool {
        if ticks <= self.best_ticks {
            return false;
        }
        self.best_ticks = ticks;
        if let Err(e) = self.store.set(&self.key, &ticks.to_string()) {
            warn!("failed to persist best score {ticks}: {e}");
        }
        true
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Leading decimal digits after optional whitespace; anything else is `None`.
fn parse_ticks(raw: &str) -> Option<Tick> {
    let trimmed = raw.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}
