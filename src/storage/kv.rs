//! Key-value backends.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// String keys to JSON values.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// All keys, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

fn poisoned() -> anyhow::Error {
    anyhow!("Key-value store lock poisoned")
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// All entries live in one pretty-printed JSON object on disk. The whole
/// file is rewritten on every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open a store, reading the file if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store from {}", path.display()))?;
            let entries: BTreeMap<String, Value> = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse store from {}", path.display()))?;
            info!(path = %path.display(), keys = entries.len(), "Store loaded from disk");
            entries
        } else {
            info!(path = %path.display(), "No saved store found, starting fresh");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn flush(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries).context("Failed to serialise store")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write store to {}", self.path.display()))?;
        debug!(path = %self.path.display(), keys = entries.len(), "Store flushed");
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    // Mutations are written to disk before memory, so a failed flush leaves
    // both unchanged.

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if !entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.keys().cloned().collect())
    }
}
