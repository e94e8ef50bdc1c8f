//! Implementation of the `pulse category` subcommands.

use crate::app::App;
use crate::commands::Out;
use crate::model::{CategorySet, OperationType, Subtype};
use crate::Result;
use anyhow::bail;

fn check_pair(kind: OperationType, subtype: Subtype) -> Result<()> {
    if !subtype.is_valid_for(kind) {
        bail!("subtype '{subtype}' is not valid for operation type '{kind}'");
    }
    Ok(())
}

pub async fn category_add(
    app: &App,
    kind: OperationType,
    subtype: Subtype,
    name: &str,
) -> Result<Out<()>> {
    check_pair(kind, subtype)?;
    let added = {
        let mut records = app.records().lock().await;
        records.add_category(kind, subtype, name).await?
    };
    app.flush_sync().await;
    let message = if added {
        format!("Added category '{name}' to {kind}/{subtype}")
    } else {
        format!("Category '{name}' already exists in {kind}/{subtype}")
    };
    Ok(Out::new_message(message))
}

pub async fn category_remove(
    app: &App,
    kind: OperationType,
    subtype: Subtype,
    name: &str,
) -> Result<Out<()>> {
    check_pair(kind, subtype)?;
    let removed = {
        let mut records = app.records().lock().await;
        records.remove_category(kind, subtype, name).await?
    };
    app.flush_sync().await;
    let message = if removed {
        format!("Removed category '{name}' from {kind}/{subtype}")
    } else {
        format!("No category '{name}' in {kind}/{subtype}")
    };
    Ok(Out::new_message(message))
}

pub async fn category_list(app: &App) -> Result<Out<CategorySet>> {
    let categories = app.records().lock().await.categories().clone();

    let mut lines = Vec::new();
    for (label, kind, subtype) in [
        ("income/main", OperationType::Income, Subtype::Main),
        ("income/side", OperationType::Income, Subtype::Side),
        ("expense/personal", OperationType::Expense, Subtype::Personal),
        ("expense/business", OperationType::Expense, Subtype::Business),
    ] {
        let names = categories.list(kind, subtype).unwrap_or_default();
        lines.push(format!("{label}: {}", names.join(", ")));
    }
    Ok(Out::new(lines.join("\n"), categories))
}
