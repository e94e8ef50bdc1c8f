//! The category vocabulary: per type/subtype lists of category names.

use crate::model::{OperationType, Subtype};
use serde::{Deserialize, Serialize};

/// The full category vocabulary, nested the same way the snapshot document
/// stores it. Lists keep their insertion order and are never auto-pruned;
/// merging with a remote set is a per-list union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySet {
    pub income: IncomeCategories,
    pub expense: ExpenseCategories,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeCategories {
    #[serde(default)]
    pub main: Vec<String>,
    #[serde(default)]
    pub side: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCategories {
    #[serde(default)]
    pub personal: Vec<String>,
    #[serde(default)]
    pub business: Vec<String>,
}

impl Default for CategorySet {
    /// The seeded vocabulary that a fresh install starts with.
    fn default() -> Self {
        let list = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            income: IncomeCategories {
                main: list(&["Salary", "Bonus", "Perks"]),
                side: list(&["Freelance", "Sales", "Consulting", "Courses"]),
            },
            expense: ExpenseCategories {
                personal: list(&[
                    "Groceries",
                    "Transport",
                    "Utilities",
                    "Entertainment",
                    "Clothing",
                    "Medicine",
                ]),
                business: list(&["Materials", "Advertising", "Fees", "Tools"]),
            },
        }
    }
}

impl CategorySet {
    /// An entirely empty set, used when deciding whether local state exists.
    pub fn empty() -> Self {
        Self {
            income: IncomeCategories::default(),
            expense: ExpenseCategories::default(),
        }
    }

    /// The list for a type/subtype pair, or `None` for an invalid pair.
    pub fn list(&self, op_type: OperationType, subtype: Subtype) -> Option<&[String]> {
        match (op_type, subtype) {
            (OperationType::Income, Subtype::Main) => Some(&self.income.main),
            (OperationType::Income, Subtype::Side) => Some(&self.income.side),
            (OperationType::Expense, Subtype::Personal) => Some(&self.expense.personal),
            (OperationType::Expense, Subtype::Business) => Some(&self.expense.business),
            _ => None,
        }
    }

    fn list_mut(&mut self, op_type: OperationType, subtype: Subtype) -> Option<&mut Vec<String>> {
        match (op_type, subtype) {
            (OperationType::Income, Subtype::Main) => Some(&mut self.income.main),
            (OperationType::Income, Subtype::Side) => Some(&mut self.income.side),
            (OperationType::Expense, Subtype::Personal) => Some(&mut self.expense.personal),
            (OperationType::Expense, Subtype::Business) => Some(&mut self.expense.business),
            _ => None,
        }
    }

    /// Adds a category name. Returns `false` when the name is already
    /// present or the type/subtype pair is invalid.
    pub fn add(&mut self, op_type: OperationType, subtype: Subtype, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.list_mut(op_type, subtype) {
            Some(list) if !list.iter().any(|c| c == name) => {
                list.push(name.to_string());
                true
            }
            _ => false,
        }
    }

    /// Removes a category name. Returns `false` when it was not present.
    pub fn remove(&mut self, op_type: OperationType, subtype: Subtype, name: &str) -> bool {
        match self.list_mut(op_type, subtype) {
            Some(list) => {
                let before = list.len();
                list.retain(|c| c != name);
                list.len() != before
            }
            None => false,
        }
    }

    /// Unions another set into this one, preserving local order and
    /// appending names only seen on the other side. Returns the number of
    /// names added.
    pub fn union_with(&mut self, other: &CategorySet) -> usize {
        let mut added = 0;
        for (local, remote) in [
            (&mut self.income.main, &other.income.main),
            (&mut self.income.side, &other.income.side),
            (&mut self.expense.personal, &other.expense.personal),
            (&mut self.expense.business, &other.expense.business),
        ] {
            for name in remote {
                if !local.iter().any(|c| c == name) {
                    local.push(name.clone());
                    added += 1;
                }
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_seeded() {
        let set = CategorySet::default();
        assert!(set
            .list(OperationType::Income, Subtype::Main)
            .unwrap()
            .contains(&"Salary".to_string()));
        assert!(set
            .list(OperationType::Expense, Subtype::Business)
            .unwrap()
            .contains(&"Tools".to_string()));
    }

    #[test]
    fn test_invalid_pair_has_no_list() {
        let set = CategorySet::default();
        assert!(set.list(OperationType::Income, Subtype::Personal).is_none());
        assert!(set.list(OperationType::Expense, Subtype::Main).is_none());
    }

    #[test]
    fn test_add_deduplicates() {
        let mut set = CategorySet::empty();
        assert!(set.add(OperationType::Income, Subtype::Side, "Tutoring"));
        assert!(!set.add(OperationType::Income, Subtype::Side, "Tutoring"));
        assert!(!set.add(OperationType::Income, Subtype::Side, "  "));
        assert_eq!(
            set.list(OperationType::Income, Subtype::Side).unwrap(),
            &["Tutoring".to_string()]
        );
    }

    #[test]
    fn test_remove() {
        let mut set = CategorySet::default();
        assert!(set.remove(OperationType::Expense, Subtype::Personal, "Transport"));
        assert!(!set.remove(OperationType::Expense, Subtype::Personal, "Transport"));
        assert!(!set
            .list(OperationType::Expense, Subtype::Personal)
            .unwrap()
            .contains(&"Transport".to_string()));
    }

    #[test]
    fn test_union_preserves_local_order() {
        let mut local = CategorySet::empty();
        local.add(OperationType::Income, Subtype::Main, "Salary");

        let mut remote = CategorySet::empty();
        remote.add(OperationType::Income, Subtype::Main, "Royalties");
        remote.add(OperationType::Income, Subtype::Main, "Salary");

        let added = local.union_with(&remote);
        assert_eq!(added, 1);
        assert_eq!(
            local.list(OperationType::Income, Subtype::Main).unwrap(),
            &["Salary".to_string(), "Royalties".to_string()]
        );

        // A second union adds nothing.
        assert_eq!(local.union_with(&remote), 0);
    }
}
