//! Implementation of the `pulse op` subcommands.

use crate::app::App;
use crate::args::{OpFieldArgs, OpListArgs};
use crate::commands::Out;
use crate::model::{report, Operation, OperationDraft};
use crate::Result;
use chrono::Local;

fn draft_from_args(fields: &OpFieldArgs) -> OperationDraft {
    OperationDraft {
        op_type: fields.kind,
        subtype: fields.subtype,
        amount: fields.amount,
        category: fields.category.clone(),
        owner: fields.owner,
        date: fields
            .date
            .unwrap_or_else(|| Local::now().date_naive()),
        comment: fields.comment.clone(),
    }
}

pub async fn op_add(app: &App, fields: &OpFieldArgs) -> Result<Out<Operation>> {
    let operation = {
        let mut records = app.records().lock().await;
        records.add_operation(draft_from_args(fields)).await?
    };
    app.flush_sync().await;
    Ok(Out::new(
        format!(
            "Recorded {} of {} in '{}' (id {})",
            operation.op_type, operation.amount, operation.category, operation.id
        ),
        operation,
    ))
}

pub async fn op_update(app: &App, id: i64, fields: &OpFieldArgs) -> Result<Out<Operation>> {
    let operation = {
        let mut records = app.records().lock().await;
        records.update_operation(id, draft_from_args(fields)).await?
    };
    app.flush_sync().await;
    Ok(Out::new(format!("Updated operation {id}"), operation))
}

pub async fn op_delete(app: &App, id: i64) -> Result<Out<()>> {
    let removed = {
        let mut records = app.records().lock().await;
        records.delete_operation(id).await?
    };
    app.flush_sync().await;
    let message = if removed {
        format!("Deleted operation {id}")
    } else {
        format!("No operation with id {id}, nothing to delete")
    };
    Ok(Out::new_message(message))
}

pub async fn op_list(app: &App, args: &OpListArgs) -> Result<Out<Vec<Operation>>> {
    let records = app.records().lock().await;
    let today = Local::now().date_naive();
    let symbol = records.settings().currency_symbol.clone();
    let selected: Vec<Operation> = report::for_period(records.operations(), args.period, today)
        .into_iter()
        .take(args.limit)
        .cloned()
        .collect();
    drop(records);

    if selected.is_empty() {
        return Ok(Out::new("No operations for this period", selected));
    }

    let mut lines = vec![format!("{} operation(s):", selected.len())];
    for op in &selected {
        lines.push(format!(
            "  {}  {}  {:>12} {}  {}/{}  {}  {}",
            op.id, op.date, op.amount.to_string(), symbol, op.op_type, op.subtype, op.category, op.comment
        ));
    }
    Ok(Out::new(lines.join("\n"), selected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Mode;
    use crate::model::{Amount, OperationType, Owner, Period, Subtype};
    use crate::store::MemoryStore;
    use crate::Config;
    use std::str::FromStr;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn app() -> (App, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path().join("home"), None).await.unwrap();
        let app = App::open_with_store(config, Mode::Memory, Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        (app, dir)
    }

    fn fields(amount: &str) -> OpFieldArgs {
        OpFieldArgs {
            kind: OperationType::Expense,
            subtype: Subtype::Personal,
            amount: Amount::from_str(amount).unwrap(),
            category: "Groceries".to_string(),
            date: None,
            comment: String::new(),
            owner: Owner::Me,
        }
    }

    #[tokio::test]
    async fn test_add_update_delete_round_trip() {
        let (app, _dir) = app().await;

        let added = op_add(&app, &fields("100")).await.unwrap();
        let id = added.structure().unwrap().id;

        let updated = op_update(&app, id, &fields("250")).await.unwrap();
        assert_eq!(
            updated.structure().unwrap().amount,
            Amount::from_str("250").unwrap()
        );

        let deleted = op_delete(&app, id).await.unwrap();
        assert!(deleted.message().contains("Deleted"));

        // Idempotent delete reports a no-op.
        let again = op_delete(&app, id).await.unwrap();
        assert!(again.message().contains("nothing to delete"));
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let (app, _dir) = app().await;
        assert!(op_update(&app, 404, &fields("1")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let (app, _dir) = app().await;
        for i in 0..5 {
            op_add(&app, &fields(&format!("{}", i + 1))).await.unwrap();
        }
        let out = op_list(
            &app,
            &OpListArgs {
                period: Period::All,
                limit: 3,
            },
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().len(), 3);
    }
}
