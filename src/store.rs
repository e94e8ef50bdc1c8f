//! The persistence primitive: a string key-value blob store.
//!
//! Everything durable in the app goes through this interface, one key per
//! collection. `FileStore` is the production implementation (one file per
//! key inside the data directory); `MemoryStore` backs tests and is compiled
//! into the production binary so the whole app can run without touching the
//! filesystem.

use crate::{utils, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Store key for the operations collection.
pub const K_OPERATIONS: &str = "operations";
/// Store key for the goals collection.
pub const K_GOALS: &str = "goals";
/// Store key for the category set.
pub const K_CATEGORIES: &str = "categories";
/// Store key for user settings.
pub const K_SETTINGS: &str = "settings";
/// Store key for the configured remote snapshot id.
pub const K_CLOUD_ID: &str = "cloud-id";
/// Store key for the last successful sync timestamp.
pub const K_LAST_SYNC: &str = "last-sync";

/// Store key for a snapshot kept locally because the vault was unreachable.
pub fn fallback_key(id: &str) -> String {
    format!("fallback/{id}")
}

/// A string key-value blob store. `get` returns `None` for a missing key,
/// which is not an error.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as a file under a single directory. Key separators are
/// flattened so `fallback/<id>` does not require nested directories.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the backing directory if needed and returns the store.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        utils::make_dir(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key.replace('/', "__")))
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        utils::read(&path).await.map(Some)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        utils::write(self.path_for(key), value).await
    }
}

/// An in-memory implementation of the `Store` trait for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
