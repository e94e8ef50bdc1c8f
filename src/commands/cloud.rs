//! Implementation of the `pulse cloud` subcommands: the explicit,
//! user-triggered sync surface. The background scheduler lives in the sync
//! service; these commands drive single pushes, pulls and loads.

use crate::app::App;
use crate::cloud::Cloud;
use crate::commands::Out;
use crate::merge::{merge_snapshot, MergeOutcome, MergePolicy};
use crate::model::Snapshot;
use crate::{Result, SyncError};

/// Points this installation at an existing snapshot id.
pub async fn cloud_link(app: &App, id: &str) -> Result<Out<()>> {
    app.sync().link(id).await?;
    Ok(Out::new_message(format!("Linked to snapshot id '{id}'")))
}

/// Pushes the full local state. When no id is linked yet, a fresh remote id
/// is generated first. A transport failure is not a hard error: the
/// snapshot lands in local storage under a new local-fallback id and the
/// message says so.
pub async fn cloud_push(app: &App) -> Result<Out<()>> {
    let id = match app.sync().remote_id().await {
        Some(id) => id,
        None => Cloud::new_remote_id(),
    };
    let snapshot = app.snapshot().await;
    let receipt = app.cloud().push_explicit(&id, snapshot).await?;
    app.sync().link(&receipt.id).await?;

    let message = if receipt.fell_back {
        format!(
            "The vault is unreachable; saved the snapshot locally as '{}' instead. \
             It will be picked up from there until a remote push succeeds",
            receipt.id
        )
    } else {
        format!("Pushed snapshot to '{}'", receipt.id)
    };
    Ok(Out::new_message(message))
}

/// Fetches the remote snapshot and reports what it contains, without
/// touching local state.
pub async fn cloud_pull(app: &App) -> Result<Out<Snapshot>> {
    let id = require_remote_id(app).await?;
    match app.cloud().pull(&id).await? {
        Some(snapshot) => {
            let message = format!(
                "Snapshot '{id}' holds {} operation(s), {} goal(s){}",
                snapshot.operations.len(),
                snapshot.goals.len(),
                snapshot
                    .last_sync
                    .map(|at| format!(", last synced {at}"))
                    .unwrap_or_default()
            );
            Ok(Out::new(message, snapshot))
        }
        None => Ok(Out::new_message(format!(
            "Nothing is stored under snapshot id '{id}'"
        ))),
    }
}

/// Fetches the remote snapshot and reconciles it into local state. With no
/// local data the load is a pure replace regardless of the requested
/// policy; otherwise the chosen policy applies.
pub async fn cloud_load(app: &App, policy: MergePolicy) -> Result<Out<MergeOutcome>> {
    let id = require_remote_id(app).await?;
    let Some(remote) = app.cloud().pull(&id).await? else {
        return Ok(Out::new_message(format!(
            "Nothing is stored under snapshot id '{id}'"
        )));
    };

    let mut records = app.records().lock().await;
    let effective = if records.is_empty() {
        MergePolicy::Replace
    } else {
        policy
    };
    let outcome = merge_snapshot(&mut records, remote, effective);
    if outcome.changed() {
        records.persist_collections().await?;
    }
    drop(records);

    let message = if !outcome.changed() {
        "Already up to date".to_string()
    } else if outcome.replaced {
        "Loaded the remote snapshot, replacing local state".to_string()
    } else {
        format!(
            "Merged the remote snapshot: {} operation(s) and {} goal(s) added, {} categorie(s) added",
            outcome.operations_added, outcome.goals_added, outcome.categories_added
        )
    };
    Ok(Out::new(message, outcome))
}

/// Shows the remote id, the last sync time and the current status.
pub async fn cloud_status(app: &App) -> Result<Out<()>> {
    let mut lines = Vec::new();
    match app.sync().remote_id().await {
        Some(id) => {
            let location = if Cloud::is_local_id(&id) {
                "local fallback"
            } else {
                "vault"
            };
            lines.push(format!("Snapshot id: {id} ({location})"));
        }
        None => lines.push("No snapshot id linked".to_string()),
    }
    match app.last_sync().await? {
        Some(at) => lines.push(format!("Last sync: {at}")),
        None => lines.push("Last sync: never".to_string()),
    }
    lines.push(format!("Status: {}", app.sync().status()));
    Ok(Out::new_message(lines.join("\n")))
}

async fn require_remote_id(app: &App) -> Result<String> {
    app.sync()
        .remote_id()
        .await
        .ok_or_else(|| SyncError::MissingRemoteId.into())
}
