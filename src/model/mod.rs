//! Types that represent the core data model, such as `Operation`, `Goal`
//! and the `Snapshot` the sync subsystem exchanges with the vault.
mod amount;
mod category;
mod goal;
mod operation;
pub mod report;
mod snapshot;

pub use amount::{Amount, AmountError};
pub use category::{CategorySet, ExpenseCategories, IncomeCategories};
use chrono::{DateTime, Utc};
pub use goal::{Goal, GoalDraft};
pub use operation::{Operation, OperationDraft, OperationType, Owner, Subtype};
pub use report::Period;
use serde::{Deserialize, Serialize};
pub use snapshot::{ExportDocument, Snapshot};

/// Common shape of the two record kinds the merge engine reconciles.
pub trait Record {
    fn id(&self) -> i64;
    fn effective_timestamp(&self) -> DateTime<Utc>;
}

impl Record for Operation {
    fn id(&self) -> i64 {
        self.id
    }

    fn effective_timestamp(&self) -> DateTime<Utc> {
        Operation::effective_timestamp(self)
    }
}

impl Record for Goal {
    fn id(&self) -> i64 {
        self.id
    }

    fn effective_timestamp(&self) -> DateTime<Utc> {
        Goal::effective_timestamp(self)
    }
}

/// User settings: how amounts are labelled in reports and exports. Not part
/// of the sync snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub currency: String,
    pub currency_symbol: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: "RUB".to_string(),
            currency_symbol: "₽".to_string(),
        }
    }
}
