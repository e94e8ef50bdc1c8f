//! Implementation of the `pulse export` command.

use crate::app::App;
use crate::commands::Out;
use crate::model::ExportDocument;
use crate::{utils, Result};
use anyhow::Context;
use chrono::{Local, Utc};
use std::path::{Path, PathBuf};

/// Serializes the full state (records, categories, settings, export date)
/// to a pretty-printed JSON document. A pure read; no sync side effects.
pub async fn export(app: &App, out_path: Option<&Path>) -> Result<Out<()>> {
    let records = app.records().lock().await;
    let document = ExportDocument {
        operations: records.operations().to_vec(),
        goals: records.goals().to_vec(),
        categories: records.categories().clone(),
        settings: records.settings().clone(),
        export_date: Utc::now(),
    };
    drop(records);

    let path = match out_path {
        Some(path) => path.to_path_buf(),
        None => default_export_path(),
    };
    let json =
        serde_json::to_string_pretty(&document).context("Unable to serialize export document")?;
    utils::write(&path, json).await?;

    Ok(Out::new_message(format!(
        "Exported {} operation(s) and {} goal(s) to '{}'",
        document.operations.len(),
        document.goals.len(),
        path.display()
    )))
}

fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "pulse-export-{}.json",
        Local::now().format("%Y-%m-%d")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::OpFieldArgs;
    use crate::cloud::Mode;
    use crate::commands::op_add;
    use crate::model::{Amount, OperationType, Owner, Subtype};
    use crate::store::MemoryStore;
    use crate::Config;
    use std::str::FromStr;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_export_document_contents() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path().join("home"), None).await.unwrap();
        let app = App::open_with_store(config, Mode::Memory, Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        op_add(
            &app,
            &OpFieldArgs {
                kind: OperationType::Income,
                subtype: Subtype::Main,
                amount: Amount::from_str("10").unwrap(),
                category: "Salary".to_string(),
                date: None,
                comment: String::new(),
                owner: Owner::Me,
            },
        )
        .await
        .unwrap();

        let out_path = dir.path().join("export.json");
        let out = export(&app, Some(&out_path)).await.unwrap();
        assert!(out.message().contains("1 operation(s)"));

        let document: ExportDocument =
            serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(document.operations.len(), 1);
        assert_eq!(document.settings.currency, "RUB");
        // Export does not mutate state.
        assert_eq!(app.records().lock().await.operations().len(), 1);
    }
}
