//! The canonical in-memory record collections and the local mutation API.
//!
//! `Records` loads the collections from the key-value store once at startup
//! and persists the touched collection on every mutation. Lookups are
//! linear scans, which is fine at personal-finance volumes; an id index
//! would be needed before this grows past a few thousand records.

use crate::model::{
    CategorySet, Goal, GoalDraft, Operation, OperationDraft, OperationType, Record, Settings,
    Snapshot, Subtype,
};
use crate::store::{self, Store};
use crate::sync::MutationNotifier;
use crate::{Result, SyncError};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

pub struct Records {
    store: Arc<dyn Store>,
    operations: Vec<Operation>,
    goals: Vec<Goal>,
    categories: CategorySet,
    settings: Settings,
    /// Highest id ever handed out, so id generation stays strictly
    /// monotonic even when two records are created in the same clock tick.
    last_id: i64,
    notifier: Option<Arc<MutationNotifier>>,
}

impl Records {
    /// Loads all collections from the store. Missing keys yield defaults
    /// (seeded categories, empty collections).
    pub async fn load(store: Arc<dyn Store>) -> Result<Self> {
        let operations: Vec<Operation> = read_or(&store, store::K_OPERATIONS, Vec::new).await?;
        let goals: Vec<Goal> = read_or(&store, store::K_GOALS, Vec::new).await?;
        let categories = read_or(&store, store::K_CATEGORIES, CategorySet::default).await?;
        let settings = read_or(&store, store::K_SETTINGS, Settings::default).await?;

        let last_id = operations
            .iter()
            .map(Record::id)
            .chain(goals.iter().map(Record::id))
            .max()
            .unwrap_or(0);

        Ok(Self {
            store,
            operations,
            goals,
            categories,
            settings,
            last_id,
            notifier: None,
        })
    }

    /// Attaches the sync service's notifier so mutations schedule a
    /// debounced push.
    pub(crate) fn attach_notifier(&mut self, notifier: Arc<MutationNotifier>) {
        self.notifier = Some(notifier);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether there is no local data worth preserving in a merge.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.goals.is_empty()
    }

    /// Clones the collections into a `Snapshot` for export or push.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            operations: self.operations.clone(),
            goals: self.goals.clone(),
            categories: self.categories.clone(),
            last_sync: None,
        }
    }

    /// A fresh record id derived from the current time. Ids within one
    /// store never repeat: two calls inside the same millisecond take
    /// consecutive values instead of colliding.
    fn next_id(&mut self) -> i64 {
        let id = Utc::now().timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        id
    }

    fn notify_mutation(&self) {
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }

    /// Creates an operation from a draft and prepends it, keeping the
    /// collection ordered most-recent-first.
    pub async fn add_operation(&mut self, draft: OperationDraft) -> Result<Operation> {
        draft.validate()?;
        let operation = Operation {
            id: self.next_id(),
            op_type: draft.op_type,
            subtype: draft.subtype,
            amount: draft.amount,
            category: draft.category,
            owner: draft.owner,
            date: draft.date,
            comment: draft.comment,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.operations.insert(0, operation.clone());
        self.persist_operations().await?;
        self.notify_mutation();
        Ok(operation)
    }

    /// Replaces the mutable fields of the operation with `id` and stamps
    /// `updated_at`. Fails when no such record exists.
    pub async fn update_operation(&mut self, id: i64, draft: OperationDraft) -> Result<Operation> {
        draft.validate()?;
        let op = self
            .operations
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or(SyncError::NotFound {
                entity: "operation",
                id,
            })?;
        op.op_type = draft.op_type;
        op.subtype = draft.subtype;
        op.amount = draft.amount;
        op.category = draft.category;
        op.owner = draft.owner;
        op.date = draft.date;
        op.comment = draft.comment;
        op.updated_at = Some(Utc::now());
        let updated = op.clone();
        self.persist_operations().await?;
        self.notify_mutation();
        Ok(updated)
    }

    /// Removes the operation with `id`. Deleting an absent id is a no-op,
    /// not an error; returns whether anything was removed.
    pub async fn delete_operation(&mut self, id: i64) -> Result<bool> {
        let before = self.operations.len();
        self.operations.retain(|op| op.id != id);
        let removed = self.operations.len() != before;
        if removed {
            self.persist_operations().await?;
            self.notify_mutation();
        }
        Ok(removed)
    }

    /// Creates a goal from a draft and appends it.
    pub async fn add_goal(&mut self, draft: GoalDraft) -> Result<Goal> {
        draft.validate()?;
        let goal = Goal {
            id: self.next_id(),
            name: draft.name,
            target_amount: draft.target_amount,
            current_amount: draft.current_amount,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.goals.push(goal.clone());
        self.persist_goals().await?;
        self.notify_mutation();
        Ok(goal)
    }

    /// Replaces the mutable fields of the goal with `id` and stamps
    /// `updated_at`. Fails when no such record exists.
    pub async fn update_goal(&mut self, id: i64, draft: GoalDraft) -> Result<Goal> {
        draft.validate()?;
        let goal = self
            .goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(SyncError::NotFound { entity: "goal", id })?;
        goal.name = draft.name;
        goal.target_amount = draft.target_amount;
        goal.current_amount = draft.current_amount;
        goal.updated_at = Some(Utc::now());
        let updated = goal.clone();
        self.persist_goals().await?;
        self.notify_mutation();
        Ok(updated)
    }

    /// Removes the goal with `id`; a no-op when absent.
    pub async fn delete_goal(&mut self, id: i64) -> Result<bool> {
        let before = self.goals.len();
        self.goals.retain(|g| g.id != id);
        let removed = self.goals.len() != before;
        if removed {
            self.persist_goals().await?;
            self.notify_mutation();
        }
        Ok(removed)
    }

    /// Adds a category name to the vocabulary. Returns `false` when it was
    /// already present.
    pub async fn add_category(
        &mut self,
        op_type: OperationType,
        subtype: Subtype,
        name: &str,
    ) -> Result<bool> {
        let added = self.categories.add(op_type, subtype, name);
        if added {
            self.persist_categories().await?;
            self.notify_mutation();
        }
        Ok(added)
    }

    /// Removes a category name from the vocabulary. Operations tagged with
    /// it keep their tag.
    pub async fn remove_category(
        &mut self,
        op_type: OperationType,
        subtype: Subtype,
        name: &str,
    ) -> Result<bool> {
        let removed = self.categories.remove(op_type, subtype, name);
        if removed {
            self.persist_categories().await?;
            self.notify_mutation();
        }
        Ok(removed)
    }

    /// Used by the merge engine after it has rewritten the collections in
    /// place.
    pub(crate) async fn persist_collections(&self) -> Result<()> {
        self.persist_operations().await?;
        self.persist_goals().await?;
        self.persist_categories().await?;
        Ok(())
    }

    /// Merge may insert records carrying remote-assigned ids; keep the id
    /// generator ahead of them.
    pub(crate) fn bump_last_id(&mut self) {
        let max = self
            .operations
            .iter()
            .map(Record::id)
            .chain(self.goals.iter().map(Record::id))
            .max()
            .unwrap_or(0);
        self.last_id = self.last_id.max(max);
    }

    pub(crate) fn operations_mut(&mut self) -> &mut Vec<Operation> {
        &mut self.operations
    }

    pub(crate) fn goals_mut(&mut self) -> &mut Vec<Goal> {
        &mut self.goals
    }

    pub(crate) fn categories_mut(&mut self) -> &mut CategorySet {
        &mut self.categories
    }

    async fn persist_operations(&self) -> Result<()> {
        let json =
            serde_json::to_string(&self.operations).context("Unable to serialize operations")?;
        self.store.set(store::K_OPERATIONS, &json).await
    }

    async fn persist_goals(&self) -> Result<()> {
        let json = serde_json::to_string(&self.goals).context("Unable to serialize goals")?;
        self.store.set(store::K_GOALS, &json).await
    }

    async fn persist_categories(&self) -> Result<()> {
        let json =
            serde_json::to_string(&self.categories).context("Unable to serialize categories")?;
        self.store.set(store::K_CATEGORIES, &json).await
    }

    /// Writes the seeded defaults for keys that are still absent. Called by
    /// `pulse init`.
    pub async fn seed_defaults(&self) -> Result<()> {
        if self.store.get(store::K_CATEGORIES).await?.is_none() {
            self.persist_categories().await?;
        }
        if self.store.get(store::K_SETTINGS).await?.is_none() {
            let json =
                serde_json::to_string(&self.settings).context("Unable to serialize settings")?;
            self.store.set(store::K_SETTINGS, &json).await?;
        }
        debug!("Seeded default categories and settings");
        Ok(())
    }
}

async fn read_or<T, F>(store: &Arc<dyn Store>, key: &str, default: F) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce() -> T,
{
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse stored '{key}' collection")),
        None => Ok(default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Owner};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use std::str::FromStr;

    async fn records() -> Records {
        Records::load(Arc::new(MemoryStore::new())).await.unwrap()
    }

    fn draft(amount: &str) -> OperationDraft {
        OperationDraft {
            op_type: OperationType::Expense,
            subtype: Subtype::Personal,
            amount: Amount::from_str(amount).unwrap(),
            category: "Groceries".to_string(),
            owner: Owner::Me,
            date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            comment: String::new(),
        }
    }

    #[tokio::test]
    async fn test_add_operations_unique_monotonic_ids() {
        let mut r = records().await;
        // A burst of adds lands within the same clock tick; every id must
        // still be unique and the collection length equal to the number of
        // calls.
        for i in 0..10 {
            r.add_operation(draft(&format!("{i}"))).await.unwrap();
        }
        assert_eq!(r.operations().len(), 10);
        let mut ids: Vec<i64> = r.operations().iter().map(|op| op.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn test_add_prepends_most_recent_first() {
        let mut r = records().await;
        r.add_operation(draft("1")).await.unwrap();
        r.add_operation(draft("2")).await.unwrap();
        assert_eq!(r.operations()[0].amount, Amount::from_str("2").unwrap());
        assert_eq!(r.operations()[1].amount, Amount::from_str("1").unwrap());
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_stamps() {
        let mut r = records().await;
        let op = r.add_operation(draft("100")).await.unwrap();

        let mut edit = draft("250");
        edit.comment = "corrected".to_string();
        let updated = r.update_operation(op.id, edit).await.unwrap();

        assert_eq!(updated.amount, Amount::from_str("250").unwrap());
        assert_eq!(updated.comment, "corrected");
        assert!(updated.updated_at.unwrap() >= updated.created_at);
        assert_eq!(r.operations().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let mut r = records().await;
        let err = r.update_operation(12345, draft("1")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::NotFound { entity: "operation", id: 12345 })
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let mut r = records().await;
        let op = r.add_operation(draft("1")).await.unwrap();
        assert!(r.delete_operation(op.id).await.unwrap());
        let after_first: Vec<i64> = r.operations().iter().map(|o| o.id).collect();
        assert!(!r.delete_operation(op.id).await.unwrap());
        let after_second: Vec<i64> = r.operations().iter().map(|o| o.id).collect();
        assert_eq!(after_first, after_second);
        assert!(r.operations().is_empty());
    }

    #[tokio::test]
    async fn test_goal_lifecycle() {
        let mut r = records().await;
        let goal = r
            .add_goal(GoalDraft {
                name: "Vacation".to_string(),
                target_amount: Amount::from_str("1000").unwrap(),
                current_amount: Amount::ZERO,
            })
            .await
            .unwrap();

        let updated = r
            .update_goal(
                goal.id,
                GoalDraft {
                    name: "Vacation".to_string(),
                    target_amount: Amount::from_str("1000").unwrap(),
                    current_amount: Amount::from_str("400").unwrap(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.current_amount, Amount::from_str("400").unwrap());
        assert!(updated.updated_at.is_some());

        assert!(r.delete_goal(goal.id).await.unwrap());
        assert!(!r.delete_goal(goal.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_persistence_survives_reload() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let op_id = {
            let mut r = Records::load(Arc::clone(&store)).await.unwrap();
            let op = r.add_operation(draft("77")).await.unwrap();
            r.add_category(OperationType::Expense, Subtype::Personal, "Pets")
                .await
                .unwrap();
            op.id
        };

        let r = Records::load(store).await.unwrap();
        assert_eq!(r.operations().len(), 1);
        assert_eq!(r.operations()[0].id, op_id);
        assert!(r
            .categories()
            .list(OperationType::Expense, Subtype::Personal)
            .unwrap()
            .contains(&"Pets".to_string()));
        // The id generator resumes past persisted ids.
        assert_eq!(r.last_id, op_id);
    }
}
