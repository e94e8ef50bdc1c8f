//! Reconciliation of a fetched remote snapshot into the local record store.
//!
//! Three policies exist. `Replace` discards local state. `Union` is the
//! additive merge behind the explicit load command: remote records with
//! unknown ids are appended, overlapping ids keep the local copy
//! untouched. `Smart` is what the periodic background sync runs: union
//! first, then last-writer-wins per overlapping id on the record's
//! effective timestamp, ties keeping the local copy.
//!
//! This is best-effort reconciliation over client-reported clocks, not a
//! linearizable protocol. Two gaps are inherent and deliberate: clock skew
//! between clients can pick a stale copy, and there are no deletion
//! tombstones, so a record deleted locally reappears when an older remote
//! snapshot still carries it.

use crate::model::{Record, Snapshot};
use crate::records::Records;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// How a remote snapshot is reconciled into local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Local state is discarded; the remote snapshot wins verbatim.
    Replace,
    /// Id-based additive merge; overlapping ids keep the local copy.
    Union,
    /// Union plus per-record last-writer-wins on effective timestamps.
    /// Reserved for the periodic background reconciliation, so not
    /// selectable from the command line.
    #[value(skip)]
    Smart,
}

serde_plain::derive_display_from_serialize!(MergePolicy);

/// What a merge changed. `changed() == false` means the merge was a no-op
/// and callers skip persistence entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub operations_added: usize,
    pub operations_updated: usize,
    pub goals_added: usize,
    pub goals_updated: usize,
    pub categories_added: usize,
    /// Set when the whole local state was replaced wholesale.
    pub replaced: bool,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.replaced
            || self.operations_added > 0
            || self.operations_updated > 0
            || self.goals_added > 0
            || self.goals_updated > 0
            || self.categories_added > 0
    }
}

/// Reconciles `remote` into `records` under the given policy. Mutates the
/// in-memory collections only; the caller persists when the outcome reports
/// changes.
pub fn merge_snapshot(records: &mut Records, remote: Snapshot, policy: MergePolicy) -> MergeOutcome {
    let outcome = match policy {
        MergePolicy::Replace => {
            let replaced = replace(records, remote);
            MergeOutcome {
                replaced,
                ..MergeOutcome::default()
            }
        }
        MergePolicy::Union => merge_collections(records, remote, false),
        MergePolicy::Smart => merge_collections(records, remote, true),
    };
    records.bump_last_id();
    debug!("merge policy {policy}: {outcome:?}");
    outcome
}

fn replace(records: &mut Records, remote: Snapshot) -> bool {
    let same = records.operations() == remote.operations.as_slice()
        && records.goals() == remote.goals.as_slice()
        && *records.categories() == remote.categories;
    *records.operations_mut() = remote.operations;
    *records.goals_mut() = remote.goals;
    *records.categories_mut() = remote.categories;
    !same
}

fn merge_collections(records: &mut Records, remote: Snapshot, smart: bool) -> MergeOutcome {
    let (operations_added, operations_updated) =
        merge_records(records.operations_mut(), remote.operations, smart);
    let (goals_added, goals_updated) = merge_records(records.goals_mut(), remote.goals, smart);
    let categories_added = records.categories_mut().union_with(&remote.categories);
    MergeOutcome {
        operations_added,
        operations_updated,
        goals_added,
        goals_updated,
        categories_added,
        replaced: false,
    }
}

/// The shared per-collection step. Remote records with ids absent locally
/// are appended. With `smart`, an overlapping id keeps whichever copy has
/// the strictly later effective timestamp; the local copy wins ties.
fn merge_records<R>(local: &mut Vec<R>, remote: Vec<R>, smart: bool) -> (usize, usize)
where
    R: Record,
{
    let known: HashSet<i64> = local.iter().map(Record::id).collect();
    let mut added = 0;
    let mut updated = 0;

    for incoming in remote {
        if !known.contains(&incoming.id()) {
            local.push(incoming);
            added += 1;
            continue;
        }
        if !smart {
            continue;
        }
        // Linear scan; collections are small.
        if let Some(existing) = local.iter_mut().find(|r| r.id() == incoming.id()) {
            if incoming.effective_timestamp() > existing.effective_timestamp() {
                *existing = incoming;
                updated += 1;
            }
        }
    }

    (added, updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Amount, CategorySet, Goal, Operation, OperationType, Owner, Subtype,
    };
    use crate::store::MemoryStore;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use std::str::FromStr;
    use std::sync::Arc;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn op(id: i64, amount: &str, created: &str, updated: Option<&str>) -> Operation {
        Operation {
            id,
            op_type: OperationType::Income,
            subtype: Subtype::Main,
            amount: Amount::from_str(amount).unwrap(),
            category: "Salary".to_string(),
            owner: Owner::Me,
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            comment: String::new(),
            created_at: ts(created),
            updated_at: updated.map(ts),
        }
    }

    fn goal(id: i64, name: &str) -> Goal {
        Goal {
            id,
            name: name.to_string(),
            target_amount: Amount::from_str("1000").unwrap(),
            current_amount: Amount::ZERO,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    async fn records_with(operations: Vec<Operation>, goals: Vec<Goal>) -> Records {
        let mut r = Records::load(Arc::new(MemoryStore::new())).await.unwrap();
        *r.operations_mut() = operations;
        *r.goals_mut() = goals;
        r
    }

    fn snapshot(operations: Vec<Operation>, goals: Vec<Goal>) -> Snapshot {
        Snapshot {
            operations,
            goals,
            categories: CategorySet::empty(),
            last_sync: None,
        }
    }

    #[tokio::test]
    async fn test_replace_discards_local() {
        let mut r = records_with(
            vec![op(1, "100", "2026-01-01T00:00:00Z", None)],
            vec![goal(2, "Old")],
        )
        .await;
        let remote = snapshot(vec![op(9, "500", "2026-02-01T00:00:00Z", None)], vec![]);

        let outcome = merge_snapshot(&mut r, remote, MergePolicy::Replace);
        assert!(outcome.replaced);
        assert!(outcome.changed());
        assert_eq!(r.operations().len(), 1);
        assert_eq!(r.operations()[0].id, 9);
        assert!(r.goals().is_empty());
    }

    #[tokio::test]
    async fn test_replace_with_identical_state_is_a_noop() {
        let local_op = op(1, "100", "2026-01-01T00:00:00Z", None);
        let mut r = records_with(vec![local_op.clone()], vec![]).await;
        let mut remote = snapshot(vec![local_op], vec![]);
        remote.categories = r.categories().clone();

        let outcome = merge_snapshot(&mut r, remote, MergePolicy::Replace);
        assert!(!outcome.changed());
    }

    #[tokio::test]
    async fn test_union_appends_unknown_ids_only() {
        let mut r = records_with(vec![op(1, "100", "2026-01-01T00:00:00Z", None)], vec![]).await;
        let remote = snapshot(
            vec![
                // Same id with a newer timestamp: union must NOT take it.
                op(1, "999", "2026-01-01T00:00:00Z", Some("2026-03-01T00:00:00Z")),
                op(2, "200", "2026-01-02T00:00:00Z", None),
            ],
            vec![goal(3, "Remote goal")],
        );

        let outcome = merge_snapshot(&mut r, remote, MergePolicy::Union);
        assert_eq!(outcome.operations_added, 1);
        assert_eq!(outcome.operations_updated, 0);
        assert_eq!(outcome.goals_added, 1);
        assert_eq!(r.operations().len(), 2);
        // The overlapping id kept the local copy.
        let kept = r.operations().iter().find(|o| o.id == 1).unwrap();
        assert_eq!(kept.amount, Amount::from_str("100").unwrap());
    }

    #[tokio::test]
    async fn test_union_id_set_is_commutative() {
        let a_ops = vec![
            op(1, "1", "2026-01-01T00:00:00Z", None),
            op(2, "2", "2026-01-01T00:00:00Z", None),
        ];
        let b_ops = vec![
            op(2, "20", "2026-01-05T00:00:00Z", None),
            op(3, "3", "2026-01-01T00:00:00Z", None),
        ];

        let mut left = records_with(a_ops.clone(), vec![]).await;
        merge_snapshot(&mut left, snapshot(b_ops.clone(), vec![]), MergePolicy::Union);
        let mut left_ids: Vec<i64> = left.operations().iter().map(|o| o.id).collect();
        left_ids.sort_unstable();

        let mut right = records_with(b_ops, vec![]).await;
        merge_snapshot(&mut right, snapshot(a_ops, vec![]), MergePolicy::Union);
        let mut right_ids: Vec<i64> = right.operations().iter().map(|o| o.id).collect();
        right_ids.sort_unstable();

        // The id sets agree; record content for overlapping ids does not
        // (each side keeps its own copy of id 2).
        assert_eq!(left_ids, right_ids);
        let l2 = left.operations().iter().find(|o| o.id == 2).unwrap();
        let r2 = right.operations().iter().find(|o| o.id == 2).unwrap();
        assert_ne!(l2.amount, r2.amount);
    }

    #[tokio::test]
    async fn test_smart_takes_strictly_newer_remote() {
        let mut r = records_with(
            vec![op(5, "100", "2024-01-01T00:00:00Z", Some("2024-01-01T00:00:00Z"))],
            vec![],
        )
        .await;
        let remote = snapshot(
            vec![op(5, "200", "2024-01-01T00:00:00Z", Some("2024-02-01T00:00:00Z"))],
            vec![],
        );

        let outcome = merge_snapshot(&mut r, remote, MergePolicy::Smart);
        assert_eq!(outcome.operations_updated, 1);
        assert_eq!(
            r.operations()[0].amount,
            Amount::from_str("200").unwrap()
        );
    }

    #[tokio::test]
    async fn test_smart_keeps_local_on_older_remote_and_ties() {
        let local = op(5, "100", "2024-01-01T00:00:00Z", Some("2024-03-01T00:00:00Z"));
        let mut r = records_with(vec![local.clone()], vec![]).await;

        // Older remote copy loses.
        let older = snapshot(
            vec![op(5, "200", "2024-01-01T00:00:00Z", Some("2024-02-01T00:00:00Z"))],
            vec![],
        );
        let outcome = merge_snapshot(&mut r, older, MergePolicy::Smart);
        assert!(!outcome.changed());
        assert_eq!(r.operations()[0].amount, Amount::from_str("100").unwrap());

        // Equal timestamps also keep the local copy.
        let tie = snapshot(
            vec![op(5, "200", "2024-01-01T00:00:00Z", Some("2024-03-01T00:00:00Z"))],
            vec![],
        );
        let outcome = merge_snapshot(&mut r, tie, MergePolicy::Smart);
        assert!(!outcome.changed());
        assert_eq!(r.operations()[0].amount, Amount::from_str("100").unwrap());
    }

    #[tokio::test]
    async fn test_smart_falls_back_to_created_at_for_legacy_records() {
        // Neither side was ever edited, so createdAt decides.
        let mut r = records_with(vec![op(7, "100", "2024-01-01T00:00:00Z", None)], vec![]).await;
        let remote = snapshot(vec![op(7, "300", "2024-06-01T00:00:00Z", None)], vec![]);

        merge_snapshot(&mut r, remote, MergePolicy::Smart);
        assert_eq!(r.operations()[0].amount, Amount::from_str("300").unwrap());
    }

    #[tokio::test]
    async fn test_smart_merge_is_idempotent() {
        let mut r = records_with(vec![op(1, "100", "2026-01-01T00:00:00Z", None)], vec![]).await;
        let remote = snapshot(
            vec![
                op(1, "150", "2026-01-01T00:00:00Z", Some("2026-02-01T00:00:00Z")),
                op(2, "200", "2026-01-02T00:00:00Z", None),
            ],
            vec![goal(3, "Remote")],
        );

        let first = merge_snapshot(&mut r, remote.clone(), MergePolicy::Smart);
        assert!(first.changed());

        let second = merge_snapshot(&mut r, remote, MergePolicy::Smart);
        assert!(!second.changed());
    }

    #[tokio::test]
    async fn test_deleted_records_resurrect() {
        // No tombstones: a record deleted locally comes back from a remote
        // snapshot that still carries it.
        let mut r = records_with(vec![op(1, "100", "2026-01-01T00:00:00Z", None)], vec![]).await;
        r.delete_operation(1).await.unwrap();
        assert!(r.operations().is_empty());

        let remote = snapshot(vec![op(1, "100", "2026-01-01T00:00:00Z", None)], vec![]);
        let outcome = merge_snapshot(&mut r, remote, MergePolicy::Smart);
        assert_eq!(outcome.operations_added, 1);
        assert_eq!(r.operations().len(), 1);
    }

    #[tokio::test]
    async fn test_categories_union_is_independent_of_timestamps() {
        let mut r = records_with(vec![], vec![]).await;
        let mut remote = snapshot(vec![], vec![]);
        remote
            .categories
            .add(OperationType::Income, Subtype::Side, "Royalties");

        let outcome = merge_snapshot(&mut r, remote, MergePolicy::Smart);
        assert_eq!(outcome.categories_added, 1);
        assert!(outcome.changed());
        assert!(r
            .categories()
            .list(OperationType::Income, Subtype::Side)
            .unwrap()
            .contains(&"Royalties".to_string()));
    }

    #[tokio::test]
    async fn test_merged_ids_advance_the_id_generator() {
        let mut r = records_with(vec![], vec![]).await;
        let far_future_id = 9_999_999_999_999;
        let remote = snapshot(
            vec![op(far_future_id, "1", "2026-01-01T00:00:00Z", None)],
            vec![],
        );
        merge_snapshot(&mut r, remote, MergePolicy::Smart);

        let draft = crate::model::OperationDraft {
            op_type: OperationType::Income,
            subtype: Subtype::Main,
            amount: Amount::ZERO,
            category: "Salary".to_string(),
            owner: Owner::Me,
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            comment: String::new(),
        };
        let created = r.add_operation(draft).await.unwrap();
        assert!(created.id > far_future_id);
    }
}
