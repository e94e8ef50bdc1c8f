//! Implements the `Vault` trait using in-memory data.
//!
//! Note: this is compiled even in the "production" version of this app so
//! that the whole sync path can run, top-to-bottom, without a reachable
//! vault. Tests additionally use the failure switch to exercise fallback
//! behavior.

use crate::cloud::Vault;
use crate::model::Snapshot;
use crate::SyncError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub(crate) struct MemoryVault {
    data: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
    push_count: AtomicUsize,
}

impl MemoryVault {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// While set, every vault call answers with a transport error.
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), SyncError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("vault unreachable".to_string()));
        }
        Ok(())
    }

    /// Seeds a snapshot, bypassing the failure switch.
    #[cfg(test)]
    pub(crate) async fn seed(&self, id: &str, snapshot: &Snapshot) {
        let json = serde_json::to_string(snapshot).unwrap();
        self.data.lock().await.insert(id.to_string(), json);
    }

    /// The raw stored blob, for assertions.
    #[cfg(test)]
    pub(crate) async fn raw(&self, id: &str) -> Option<String> {
        self.data.lock().await.get(id).cloned()
    }

    /// How many successful pushes the vault has accepted.
    #[cfg(test)]
    pub(crate) fn pushes(&self) -> usize {
        self.push_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Vault for MemoryVault {
    async fn push(&self, id: &str, snapshot: &Snapshot) -> Result<(), SyncError> {
        self.check()?;
        let json = serde_json::to_string(snapshot).map_err(SyncError::MalformedSnapshot)?;
        self.data.lock().await.insert(id.to_string(), json);
        self.push_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pull(&self, id: &str) -> Result<Option<Snapshot>, SyncError> {
        self.check()?;
        match self.data.lock().await.get(id) {
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(SyncError::MalformedSnapshot),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategorySet;

    #[tokio::test]
    async fn test_round_trip() {
        let vault = MemoryVault::new();
        let snapshot = Snapshot {
            operations: vec![],
            goals: vec![],
            categories: CategorySet::default(),
            last_sync: None,
        };
        vault.push("a", &snapshot).await.unwrap();
        assert_eq!(vault.pull("a").await.unwrap().unwrap(), snapshot);
        assert!(vault.pull("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let vault = MemoryVault::new();
        vault.set_failing(true);
        assert!(matches!(
            vault.pull("a").await.unwrap_err(),
            SyncError::Transport(_)
        ));
        vault.set_failing(false);
        assert!(vault.pull("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_blob() {
        let vault = MemoryVault::new();
        vault
            .data
            .lock()
            .await
            .insert("bad".to_string(), "{not json".to_string());
        assert!(matches!(
            vault.pull("bad").await.unwrap_err(),
            SyncError::MalformedSnapshot(_)
        ));
    }
}
