//! The `Operation` record: a single income or expense entry.

use crate::model::Amount;
use crate::Result;
use anyhow::bail;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Whether an operation adds to or subtracts from the balance.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    #[default]
    Income,
    Expense,
}

serde_plain::derive_display_from_serialize!(OperationType);
serde_plain::derive_fromstr_from_deserialize!(OperationType);

/// Refines the operation type: income is either from the main job or a side
/// hustle; expenses are either personal or for the side business.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    #[default]
    Main,
    Side,
    Personal,
    Business,
}

serde_plain::derive_display_from_serialize!(Subtype);
serde_plain::derive_fromstr_from_deserialize!(Subtype);

impl Subtype {
    /// Whether this subtype belongs to the given operation type.
    pub fn is_valid_for(self, op_type: OperationType) -> bool {
        match op_type {
            OperationType::Income => matches!(self, Subtype::Main | Subtype::Side),
            OperationType::Expense => matches!(self, Subtype::Personal | Subtype::Business),
        }
    }
}

/// Which household member the operation belongs to. Legacy records predate
/// this field and deserialize as `Me`.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    #[default]
    Me,
    Other,
}

serde_plain::derive_display_from_serialize!(Owner);
serde_plain::derive_fromstr_from_deserialize!(Owner);

/// A single income or expense record.
///
/// Serializes camelCase to stay wire-compatible with snapshot documents
/// produced by earlier versions of the app; `created_at` accepts the legacy
/// `timestamp` field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: i64,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub subtype: Subtype,
    pub amount: Amount,
    pub category: String,
    #[serde(default)]
    pub owner: Owner,
    pub date: NaiveDate,
    #[serde(default)]
    pub comment: String,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Operation {
    /// The timestamp that merge conflict resolution compares: the last edit
    /// time, or the creation time for records never edited.
    pub fn effective_timestamp(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// The user-editable fields of an operation, as accepted by the mutation
/// API. Ids and timestamps are assigned by the record store.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDraft {
    pub op_type: OperationType,
    pub subtype: Subtype,
    pub amount: Amount,
    pub category: String,
    pub owner: Owner,
    pub date: NaiveDate,
    pub comment: String,
}

impl OperationDraft {
    /// Checks the draft invariants: the subtype must belong to the type and
    /// the amount must not be negative.
    pub fn validate(&self) -> Result<()> {
        if !self.subtype.is_valid_for(self.op_type) {
            bail!(
                "subtype '{}' is not valid for operation type '{}'",
                self.subtype,
                self.op_type
            );
        }
        if self.amount.is_negative() {
            bail!("operation amount must not be negative, got {}", self.amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn draft() -> OperationDraft {
        OperationDraft {
            op_type: OperationType::Income,
            subtype: Subtype::Main,
            amount: Amount::from_str("1000").unwrap(),
            category: "Salary".to_string(),
            owner: Owner::Me,
            date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            comment: String::new(),
        }
    }

    #[test]
    fn test_subtype_validity() {
        assert!(Subtype::Main.is_valid_for(OperationType::Income));
        assert!(Subtype::Side.is_valid_for(OperationType::Income));
        assert!(!Subtype::Personal.is_valid_for(OperationType::Income));
        assert!(Subtype::Personal.is_valid_for(OperationType::Expense));
        assert!(Subtype::Business.is_valid_for(OperationType::Expense));
        assert!(!Subtype::Main.is_valid_for(OperationType::Expense));
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut bad_subtype = draft();
        bad_subtype.subtype = Subtype::Business;
        assert!(bad_subtype.validate().is_err());

        let mut negative = draft();
        negative.amount = Amount::from_str("-5").unwrap();
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_effective_timestamp() {
        let created = Utc::now();
        let mut op = Operation {
            id: 1,
            op_type: OperationType::Expense,
            subtype: Subtype::Personal,
            amount: Amount::ZERO,
            category: "Groceries".to_string(),
            owner: Owner::Me,
            date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            comment: String::new(),
            created_at: created,
            updated_at: None,
        };
        assert_eq!(op.effective_timestamp(), created);

        let edited = created + chrono::Duration::hours(1);
        op.updated_at = Some(edited);
        assert_eq!(op.effective_timestamp(), edited);
    }

    #[test]
    fn test_legacy_json_parses() {
        // Old records carry `timestamp` instead of `createdAt`, no `owner`,
        // no `updatedAt`, and a numeric amount.
        let json = r#"{
            "id": 1719400000000,
            "type": "expense",
            "subtype": "personal",
            "amount": 250.5,
            "category": "Transport",
            "date": "2024-06-26",
            "comment": "metro pass",
            "timestamp": "2024-06-26T10:15:00Z"
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.op_type, OperationType::Expense);
        assert_eq!(op.owner, Owner::Me);
        assert_eq!(op.amount, Amount::from_str("250.5").unwrap());
        assert!(op.updated_at.is_none());
        assert_eq!(
            op.created_at,
            DateTime::parse_from_rfc3339("2024-06-26T10:15:00Z").unwrap()
        );
    }

    #[test]
    fn test_round_trip_uses_camel_case() {
        let op = Operation {
            id: 7,
            op_type: OperationType::Income,
            subtype: Subtype::Side,
            amount: Amount::from_str("100").unwrap(),
            category: "Freelance".to_string(),
            owner: Owner::Other,
            date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            comment: "invoice 12".to_string(),
            created_at: Utc::now(),
            updated_at: Some(Utc::now()),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"type\":\"income\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"updatedAt\""));
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }

    #[test]
    fn test_plain_enum_strings() {
        assert_eq!(OperationType::Income.to_string(), "income");
        assert_eq!(Subtype::Business.to_string(), "business");
        assert_eq!(Owner::from_str("other").unwrap(), Owner::Other);
    }
}
