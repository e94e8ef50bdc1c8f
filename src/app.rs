//! The application state object: one controller owning the store, the
//! record collections and the sync service, passed by reference to every
//! command handler. Nothing in the crate reaches for ambient globals.

use crate::cloud::{self, Cloud, Mode};
use crate::model::Snapshot;
use crate::records::Records;
use crate::store::{self, FileStore, Store};
use crate::sync::SyncService;
use crate::{Config, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct App {
    config: Config,
    store: Arc<dyn Store>,
    records: Arc<Mutex<Records>>,
    cloud: Arc<Cloud>,
    sync: Arc<SyncService>,
}

impl App {
    /// Builds the full object graph from a loaded configuration: the file
    /// store, the record collections, the vault for `mode`, and the sync
    /// service wired to receive mutation events.
    pub async fn open(config: Config, mode: Mode) -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(FileStore::open(config.data_dir()).await?);
        Self::open_with_store(config, mode, store).await
    }

    /// Like `open`, with the store injected. Tests hand in a `MemoryStore`.
    pub async fn open_with_store(
        config: Config,
        mode: Mode,
        store: Arc<dyn Store>,
    ) -> Result<Self> {
        let records = Arc::new(Mutex::new(Records::load(Arc::clone(&store)).await?));
        let vault = cloud::vault(&config, mode)?;
        let cloud = Arc::new(Cloud::new(vault, Arc::clone(&store)));
        let remote_id = store.get(store::K_CLOUD_ID).await?;
        let sync = SyncService::new(
            Arc::clone(&records),
            Arc::clone(&cloud),
            Arc::clone(&store),
            remote_id,
            config.sync_tuning(),
        );
        records.lock().await.attach_notifier(sync.notifier());
        Ok(Self {
            config,
            store,
            records,
            cloud,
            sync,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn records(&self) -> &Arc<Mutex<Records>> {
        &self.records
    }

    pub fn cloud(&self) -> &Cloud {
        &self.cloud
    }

    pub fn sync(&self) -> &Arc<SyncService> {
        &self.sync
    }

    /// Clones the current state into a snapshot for push or export.
    pub async fn snapshot(&self) -> Snapshot {
        self.records.lock().await.snapshot()
    }

    /// When the last successful sync finished, if ever.
    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(store::K_LAST_SYNC).await? else {
            return Ok(None);
        };
        Ok(DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)))
    }

    /// Flushes any pending debounced push. One-shot CLI invocations call
    /// this before exiting so a mutation's push does not wait out the quiet
    /// window of a process that is about to end.
    pub async fn flush_sync(&self) {
        self.sync.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_with_memory_store_and_vault() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path().join("home"), None).await.unwrap();
        let app = App::open_with_store(config, Mode::Memory, Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert!(app.records().lock().await.is_empty());
        assert!(app.sync().remote_id().await.is_none());
        assert!(app.last_sync().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remote_id_restored_from_store() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path().join("home"), None).await.unwrap();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store.set(store::K_CLOUD_ID, "remote-7").await.unwrap();

        let app = App::open_with_store(config, Mode::Memory, store).await.unwrap();
        assert_eq!(app.sync().remote_id().await.as_deref(), Some("remote-7"));
    }
}
