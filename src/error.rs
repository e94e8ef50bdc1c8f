//! Error types. Most of the crate uses `anyhow` with context added at call
//! sites; the sync subsystem carries a small typed taxonomy (`SyncError`) so
//! that background paths can tell a transport outage from a bad payload.

use std::error::Error as StdError;
use std::fmt;
use std::fmt::{Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The failure taxonomy of the sync subsystem.
///
/// Background sync paths catch these, log them and degrade to an `offline`
/// status; explicit commands surface them (wrapped in `anyhow`) or, for
/// push, convert them into a local-fallback receipt.
#[derive(Debug)]
pub enum SyncError {
    /// A mutation targeted a record id that does not exist.
    NotFound { entity: &'static str, id: i64 },
    /// The remote vault was unreachable or answered with a non-success status.
    Transport(String),
    /// A fetched snapshot blob could not be parsed.
    MalformedSnapshot(serde_json::Error),
    /// A sync action was attempted with no remote snapshot id configured.
    MissingRemoteId,
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NotFound { entity, id } => write!(f, "no {entity} with id {id}"),
            SyncError::Transport(message) => write!(f, "vault transport failure: {message}"),
            SyncError::MalformedSnapshot(e) => write!(f, "malformed snapshot: {e}"),
            SyncError::MissingRemoteId => write!(
                f,
                "no remote snapshot id is configured, run 'pulse cloud link' or 'pulse cloud push' first"
            ),
        }
    }
}

impl StdError for SyncError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SyncError::MalformedSnapshot(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let e = SyncError::NotFound {
            entity: "operation",
            id: 42,
        };
        assert_eq!(e.to_string(), "no operation with id 42");
    }

    #[test]
    fn test_malformed_snapshot_source() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = SyncError::MalformedSnapshot(parse_err);
        assert!(e.source().is_some());
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let e: Error = SyncError::MissingRemoteId.into();
        assert!(matches!(
            e.downcast_ref::<SyncError>(),
            Some(SyncError::MissingRemoteId)
        ));
    }
}
