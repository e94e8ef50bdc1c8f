//! The sync scheduler: periodic pull + smart merge + push, and the
//! debounced push that follows local mutations.
//!
//! Status moves `Disabled → Syncing → Online/Offline` and is published on a
//! watch channel. Background failures are logged and degrade the status;
//! they never surface to the user. There is no cross-trigger ordering: a
//! periodic cycle and a debounced push may overlap, and the later write
//! wins. Access to the record store itself is serialized behind its mutex,
//! so individual reads and writes never interleave mid-collection.
//!
//! Disabling auto-sync only prevents future timer firings; a cycle already
//! in flight completes and still writes shared state.

use crate::cloud::{Cloud, PushTarget};
use crate::merge::{merge_snapshot, MergeOutcome, MergePolicy};
use crate::records::Records;
use crate::store::{self, Store};
use crate::{Result, SyncError};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Where the sync service currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No periodic timer is running.
    Disabled,
    /// A pull or push is in flight.
    Syncing,
    /// The last sync step reached the vault.
    Online,
    /// The last sync step failed or fell back to local storage.
    Offline,
}

serde_plain::derive_display_from_serialize!(SyncStatus);

/// Timing knobs for the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SyncTuning {
    /// How often the periodic reconciliation fires.
    pub interval: Duration,
    /// The quiet window that collapses a burst of mutations into one push.
    pub debounce: Duration,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            debounce: Duration::from_millis(2000),
        }
    }
}

/// Handed to the record store so every mutation can schedule a debounced
/// push without the store knowing anything about the scheduler.
pub(crate) struct MutationNotifier {
    pending: AtomicBool,
    tx: mpsc::UnboundedSender<()>,
}

impl MutationNotifier {
    pub(crate) fn notify(&self) {
        self.pending.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }
}

pub struct SyncService {
    records: Arc<Mutex<Records>>,
    cloud: Arc<Cloud>,
    store: Arc<dyn Store>,
    tuning: SyncTuning,
    remote_id: RwLock<Option<String>>,
    status_tx: watch::Sender<SyncStatus>,
    notifier: Arc<MutationNotifier>,
    /// Taken by the debounce task on first start.
    mutation_rx: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
    /// Present while the periodic timer runs; dropping or signalling it
    /// stops future firings.
    timer_cancel: Mutex<Option<watch::Sender<bool>>>,
}

impl SyncService {
    pub fn new(
        records: Arc<Mutex<Records>>,
        cloud: Arc<Cloud>,
        store: Arc<dyn Store>,
        remote_id: Option<String>,
        tuning: SyncTuning,
    ) -> Arc<Self> {
        let (status_tx, _) = watch::channel(SyncStatus::Disabled);
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            records,
            cloud,
            store,
            tuning,
            remote_id: RwLock::new(remote_id),
            status_tx,
            notifier: Arc::new(MutationNotifier {
                pending: AtomicBool::new(false),
                tx,
            }),
            mutation_rx: Mutex::new(Some(rx)),
            timer_cancel: Mutex::new(None),
        })
    }

    pub(crate) fn notifier(&self) -> Arc<MutationNotifier> {
        Arc::clone(&self.notifier)
    }

    pub fn status(&self) -> SyncStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, status: SyncStatus) {
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            debug!("sync status: {previous} -> {status}");
        }
    }

    pub async fn remote_id(&self) -> Option<String> {
        self.remote_id.read().await.clone()
    }

    /// Records the remote snapshot id, persisting it so reconciliation
    /// resumes across restarts.
    pub async fn link(&self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        self.store.set(store::K_CLOUD_ID, &id).await?;
        *self.remote_id.write().await = Some(id);
        Ok(())
    }

    /// Startup. Always arms the debounce path. When a remote id is already
    /// configured, runs one pull + smart merge: on success the periodic
    /// timer starts; on failure the service stays offline and the timer is
    /// not started (the user re-enables once connectivity returns).
    pub async fn start(self: &Arc<Self>) {
        self.spawn_debounce().await;
        let Some(id) = self.remote_id().await else {
            return;
        };
        self.set_status(SyncStatus::Syncing);
        match self.pull_and_merge(&id).await {
            Ok(_) => {
                self.set_status(SyncStatus::Online);
                self.start_timer(false).await;
            }
            Err(e) => {
                warn!("initial sync failed: {e:#}");
                self.set_status(SyncStatus::Offline);
            }
        }
    }

    /// Starts periodic reconciliation, firing immediately. Fails visibly
    /// when no remote id is configured; a no-op when the timer is already
    /// running.
    pub async fn enable_auto_sync(self: &Arc<Self>) -> Result<()> {
        if self.remote_id().await.is_none() {
            return Err(SyncError::MissingRemoteId.into());
        }
        self.spawn_debounce().await;
        self.start_timer(true).await;
        Ok(())
    }

    /// Stops future periodic firings. A cycle already in flight completes.
    pub async fn disable_auto_sync(&self) {
        if let Some(cancel) = self.timer_cancel.lock().await.take() {
            let _ = cancel.send(true);
        }
        self.set_status(SyncStatus::Disabled);
    }

    pub async fn auto_sync_enabled(&self) -> bool {
        self.timer_cancel.lock().await.is_some()
    }

    /// Immediately performs the pending debounced push, if any. One-shot
    /// command invocations call this before exiting instead of waiting out
    /// the quiet window.
    pub async fn flush(&self) {
        self.push_pending().await;
    }

    async fn start_timer(self: &Arc<Self>, immediate: bool) {
        let mut guard = self.timer_cancel.lock().await;
        if guard.is_some() {
            return;
        }
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        *guard = Some(cancel_tx);
        drop(guard);

        let service = Arc::clone(self);
        tokio::spawn(async move {
            let first = if immediate {
                tokio::time::Instant::now()
            } else {
                tokio::time::Instant::now() + service.tuning.interval
            };
            let mut ticker = tokio::time::interval_at(first, service.tuning.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => service.sync_cycle().await,
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("periodic sync timer stopped");
        });
    }

    /// One periodic reconciliation: pull + smart merge, then a full push of
    /// the possibly-just-merged local state. Any failure of either step
    /// degrades to offline; the next tick is the retry.
    async fn sync_cycle(&self) {
        let Some(id) = self.remote_id().await else {
            return;
        };
        self.set_status(SyncStatus::Syncing);
        match self.pull_merge_push(&id).await {
            Ok(PushTarget::Remote) => self.set_status(SyncStatus::Online),
            Ok(PushTarget::LocalFallback) => self.set_status(SyncStatus::Offline),
            Err(e) => {
                warn!("background sync failed: {e:#}");
                self.set_status(SyncStatus::Offline);
            }
        }
    }

    async fn pull_merge_push(&self, id: &str) -> Result<PushTarget> {
        self.pull_and_merge(id).await?;
        let snapshot = self.records.lock().await.snapshot();
        let target = self.cloud.push_silent(id, snapshot).await?;
        self.store
            .set(store::K_LAST_SYNC, &Utc::now().to_rfc3339())
            .await?;
        Ok(target)
    }

    /// Pulls the remote snapshot and smart-merges it into local state.
    /// When the merge brings no changes, persistence is skipped entirely.
    pub(crate) async fn pull_and_merge(&self, id: &str) -> Result<MergeOutcome> {
        let Some(remote) = self.cloud.pull(id).await? else {
            debug!("nothing stored under snapshot id {id}");
            return Ok(MergeOutcome::default());
        };
        let mut records = self.records.lock().await;
        let outcome = merge_snapshot(&mut records, remote, MergePolicy::Smart);
        if outcome.changed() {
            records.persist_collections().await?;
            info!("merged remote changes: {outcome:?}");
        } else {
            debug!("remote snapshot brought no changes");
        }
        Ok(outcome)
    }

    /// Arms the debounce task. Repeated mutations inside the quiet window
    /// collapse into a single push fired after the window elapses with no
    /// further mutation; the burst's final state is what gets pushed.
    async fn spawn_debounce(self: &Arc<Self>) {
        let Some(mut rx) = self.mutation_rx.lock().await.take() else {
            return;
        };
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(service.tuning.debounce) => break,
                        more = rx.recv() => {
                            if more.is_none() {
                                return;
                            }
                        }
                    }
                }
                service.push_pending().await;
            }
            debug!("debounce task stopped");
        });
    }

    /// The debounced push body: a full push of current local state, never a
    /// pull. A no-op when nothing is pending or no remote id is configured.
    async fn push_pending(&self) {
        if !self.notifier.pending.swap(false, Ordering::SeqCst) {
            return;
        }
        let Some(id) = self.remote_id().await else {
            return;
        };
        self.set_status(SyncStatus::Syncing);
        let snapshot = self.records.lock().await.snapshot();
        match self.cloud.push_silent(&id, snapshot).await {
            Ok(PushTarget::Remote) => {
                if let Err(e) = self
                    .store
                    .set(store::K_LAST_SYNC, &Utc::now().to_rfc3339())
                    .await
                {
                    warn!("failed to record last-sync time: {e:#}");
                }
                self.set_status(SyncStatus::Online);
            }
            Ok(PushTarget::LocalFallback) => self.set_status(SyncStatus::Offline),
            Err(e) => {
                warn!("debounced push failed: {e:#}");
                self.set_status(SyncStatus::Offline);
            }
        }
    }
}
