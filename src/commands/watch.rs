//! Implementation of the `pulse watch` command: runs the sync scheduler in
//! the foreground until interrupted.

use crate::app::App;
use crate::commands::Out;
use crate::{Result, SyncError};
use anyhow::Context;
use tracing::info;

/// Starts the sync service (initial pull + smart merge, then the periodic
/// timer and the debounced push path) and blocks until Ctrl-C. Status
/// transitions are logged as they happen.
pub async fn watch(app: &App) -> Result<Out<()>> {
    if app.sync().remote_id().await.is_none() {
        return Err(SyncError::MissingRemoteId.into());
    }

    app.sync().start().await;
    info!("Sync running, status: {}. Press Ctrl-C to stop", app.sync().status());

    // If the initial sync failed the timer was not started; arm it so the
    // foreground loop keeps retrying on the configured interval.
    if !app.sync().auto_sync_enabled().await {
        app.sync().enable_auto_sync().await?;
    }

    let mut status_rx = app.sync().subscribe();
    loop {
        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => {
                interrupted.context("Failed to listen for Ctrl-C")?;
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                info!("sync status: {}", *status_rx.borrow());
            }
        }
    }

    // Stop future firings and push anything a mutation left pending. An
    // in-flight cycle still completes on its own.
    app.sync().disable_auto_sync().await;
    app.sync().flush().await;
    Ok(Out::new_message("Stopped sync"))
}
