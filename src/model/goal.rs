//! The `Goal` record: a savings target with accumulated progress.

use crate::model::Amount;
use crate::Result;
use anyhow::bail;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub target_amount: Amount,
    pub current_amount: Amount,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Goal {
    /// The timestamp that merge conflict resolution compares.
    pub fn effective_timestamp(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Progress toward the target as a percentage, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        let target = self.target_amount.value();
        if target.is_zero() {
            return 0.0;
        }
        let ratio = (self.current_amount.value() / target)
            .to_f64()
            .unwrap_or_default();
        (ratio * 100.0).min(100.0)
    }
}

/// The user-editable fields of a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDraft {
    pub name: String,
    pub target_amount: Amount,
    pub current_amount: Amount,
}

impl GoalDraft {
    /// Checks the draft invariants: the target must be positive and the
    /// accumulated amount must not be negative.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("goal name must not be empty");
        }
        if self.target_amount.is_zero() || self.target_amount.is_negative() {
            bail!(
                "goal target amount must be positive, got {}",
                self.target_amount
            );
        }
        if self.current_amount.is_negative() {
            bail!(
                "goal current amount must not be negative, got {}",
                self.current_amount
            );
        }
        Ok(())
    }
}
