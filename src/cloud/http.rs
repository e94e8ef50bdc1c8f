//! Implements the `Vault` trait against the snapshot-vault HTTP API.
//!
//! The API is a plain authenticated blob store: `PUT /v1/snapshots/{id}`
//! writes a snapshot, `GET /v1/snapshots/{id}` reads one back, 404 means
//! nothing is stored there. The bearer token comes from configuration and
//! is never baked into the binary.

use crate::cloud::Vault;
use crate::model::Snapshot;
use crate::SyncError;
use reqwest::StatusCode;
use tracing::trace;
use url::Url;

pub(crate) struct HttpVault {
    client: reqwest::Client,
    base: Url,
    token: String,
}

impl HttpVault {
    pub(crate) fn new(base: Url, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
            token,
        }
    }

    fn snapshot_url(&self, id: &str) -> Result<Url, SyncError> {
        self.base
            .join(&format!("v1/snapshots/{id}"))
            .map_err(|e| SyncError::Transport(format!("invalid snapshot url for id '{id}': {e}")))
    }
}

#[async_trait::async_trait]
impl Vault for HttpVault {
    async fn push(&self, id: &str, snapshot: &Snapshot) -> Result<(), SyncError> {
        trace!("push snapshot to vault id {id}");
        let url = self.snapshot_url(id)?;
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(snapshot)
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Transport(format!(
                "vault answered {status} to push: {}",
                truncate(&body)
            )));
        }
        Ok(())
    }

    async fn pull(&self, id: &str) -> Result<Option<Snapshot>, SyncError> {
        trace!("pull snapshot from vault id {id}");
        let url = self.snapshot_url(id)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Transport(format!(
                "vault answered {status} to pull: {}",
                truncate(&body)
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(SyncError::MalformedSnapshot)
    }
}

/// Keeps error messages readable when the service answers with a page of
/// HTML.
fn truncate(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map(|(ix, _)| ix)
        .unwrap_or(body.len());
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_url() {
        let vault = HttpVault::new(
            Url::parse("https://vault.example.com/").unwrap(),
            "token".to_string(),
        );
        assert_eq!(
            vault.snapshot_url("abc-123").unwrap().as_str(),
            "https://vault.example.com/v1/snapshots/abc-123"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        let long = "x".repeat(500);
        assert_eq!(truncate(&long).len(), 200);
    }
}
