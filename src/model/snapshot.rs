//! The `Snapshot`: the complete serializable state exchanged with the
//! vault, and the export document produced by `pulse export`.

use crate::model::{CategorySet, Goal, Operation, Settings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The full exportable state. This is the unit the transport moves; there
/// are no partial or incremental snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default = "CategorySet::empty")]
    pub categories: CategorySet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Whether the snapshot carries no records at all.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.goals.is_empty()
    }
}

/// The document written by `pulse export`: the snapshot collections plus
/// user settings and the moment of export. A pure projection of state; the
/// sync subsystem never reads it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub operations: Vec<Operation>,
    pub goals: Vec<Goal>,
    pub categories: CategorySet,
    pub settings: Settings,
    pub export_date: DateTime<Utc>,
}
