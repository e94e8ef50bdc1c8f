//! Moving snapshots to and from a durable remote location.
//!
//! The raw transport is the `Vault` trait: write a snapshot under an id,
//! read one back. `HttpVault` talks to the real snapshot-vault service;
//! `MemoryVault` is an in-memory stand-in that is compiled even in the
//! "production" version of this app so the whole sync path can run,
//! top-to-bottom, without network access.
//!
//! `Cloud` layers the fallback contract on top: when the vault is
//! unreachable, snapshots land in the local store under a `local-` id and
//! pulls for such ids never touch the network.

mod http;
mod memory;

use crate::model::Snapshot;
use crate::store::{fallback_key, Store};
use crate::{Config, Result, SyncError};
use chrono::{DateTime, Utc};
pub(crate) use http::HttpVault;
pub(crate) use memory::MemoryVault;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Ids carrying this prefix identify snapshots that live in the local
/// store, not in the vault.
pub const LOCAL_PREFIX: &str = "local-";

const TEST_MODE_ENV: &str = "PULSE_SYNC_IN_TEST_MODE";

/// A durable location for full snapshots, addressed by id. Pulling an id
/// nobody has written returns `None`, which is not an error.
#[async_trait::async_trait]
pub trait Vault: Send + Sync {
    async fn push(&self, id: &str, snapshot: &Snapshot) -> std::result::Result<(), SyncError>;
    async fn pull(&self, id: &str) -> std::result::Result<Option<Snapshot>, SyncError>;
}

/// Which `Vault` implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Http,
    Memory,
}

impl Mode {
    /// This allows for exercising the program without a reachable vault.
    /// When `PULSE_SYNC_IN_TEST_MODE` is set and non-zero in length, the
    /// mode will be `Mode::Memory`, otherwise `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Memory,
            _ => Mode::Http,
        }
    }
}

/// Constructs the vault implementation for the given mode.
pub fn vault(config: &Config, mode: Mode) -> Result<Arc<dyn Vault>> {
    match mode {
        Mode::Http => {
            let base = config.vault_url()?;
            let token = config.vault_token()?;
            Ok(Arc::new(HttpVault::new(base, token)))
        }
        Mode::Memory => Ok(Arc::new(MemoryVault::new())),
    }
}

/// The result of an explicit push.
#[derive(Debug, Clone)]
pub struct PushReceipt {
    /// Where the snapshot ended up. Differs from the requested id when the
    /// push fell back to local storage.
    pub id: String,
    pub fell_back: bool,
    /// The `last_sync` stamp written into the snapshot before transmission.
    pub at: DateTime<Utc>,
}

/// Where a silent push landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushTarget {
    Remote,
    LocalFallback,
}

/// The snapshot transport with local-fallback semantics layered on.
pub struct Cloud {
    vault: Arc<dyn Vault>,
    store: Arc<dyn Store>,
}

impl Cloud {
    pub fn new(vault: Arc<dyn Vault>, store: Arc<dyn Store>) -> Self {
        Self { vault, store }
    }

    /// A fresh id for a snapshot that will live in the local store.
    pub fn new_local_id() -> String {
        format!("{LOCAL_PREFIX}{}", Uuid::new_v4())
    }

    /// A fresh id for a snapshot in the vault.
    pub fn new_remote_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn is_local_id(id: &str) -> bool {
        id.starts_with(LOCAL_PREFIX)
    }

    /// Fetches the snapshot stored under `id`. Local-fallback ids read from
    /// the local store; everything else goes to the vault. `None` means
    /// nothing has been stored there yet.
    pub async fn pull(&self, id: &str) -> std::result::Result<Option<Snapshot>, SyncError> {
        if Self::is_local_id(id) {
            let raw = self
                .store
                .get(&fallback_key(id))
                .await
                .map_err(|e| SyncError::Transport(format!("local store read failed: {e:#}")))?;
            return match raw {
                Some(raw) => serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(SyncError::MalformedSnapshot),
                None => Ok(None),
            };
        }
        self.vault.pull(id).await
    }

    /// The background push path. Stamps `last_sync`, tries the vault, and
    /// on transport failure falls back to the local store under the same
    /// id. The failure is logged and swallowed; the caller only learns
    /// where the snapshot landed.
    pub async fn push_silent(
        &self,
        id: &str,
        mut snapshot: Snapshot,
    ) -> std::result::Result<PushTarget, SyncError> {
        let at = Utc::now();
        snapshot.last_sync = Some(at);

        if Self::is_local_id(id) {
            self.store_fallback(id, &snapshot).await?;
            return Ok(PushTarget::LocalFallback);
        }

        match self.vault.push(id, &snapshot).await {
            Ok(()) => {
                debug!("pushed snapshot to vault id {id}");
                Ok(PushTarget::Remote)
            }
            Err(e) => {
                warn!("push to vault failed, keeping snapshot locally: {e}");
                self.store_fallback(id, &snapshot).await?;
                Ok(PushTarget::LocalFallback)
            }
        }
    }

    /// The explicit user-triggered push. On transport failure it does not
    /// reuse the caller's id: a new local-fallback id is generated so the
    /// failed remote write cannot be shadowed by a stale local copy, and
    /// the receipt reports the fallback for the status message.
    pub async fn push_explicit(&self, id: &str, mut snapshot: Snapshot) -> Result<PushReceipt> {
        let at = Utc::now();
        snapshot.last_sync = Some(at);

        if Self::is_local_id(id) {
            self.store_fallback(id, &snapshot).await?;
            return Ok(PushReceipt {
                id: id.to_string(),
                fell_back: false,
                at,
            });
        }

        match self.vault.push(id, &snapshot).await {
            Ok(()) => Ok(PushReceipt {
                id: id.to_string(),
                fell_back: false,
                at,
            }),
            Err(e) => {
                warn!("explicit push to vault failed: {e}");
                let local_id = Self::new_local_id();
                self.store_fallback(&local_id, &snapshot).await?;
                Ok(PushReceipt {
                    id: local_id,
                    fell_back: true,
                    at,
                })
            }
        }
    }

    async fn store_fallback(&self, id: &str, snapshot: &Snapshot) -> std::result::Result<(), SyncError> {
        let json = serde_json::to_string(snapshot).map_err(SyncError::MalformedSnapshot)?;
        self.store
            .set(&fallback_key(id), &json)
            .await
            .map_err(|e| SyncError::Transport(format!("local store write failed: {e:#}")))
    }
}
