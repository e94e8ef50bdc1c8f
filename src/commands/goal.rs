//! Implementation of the `pulse goal` subcommands.

use crate::app::App;
use crate::args::GoalFieldArgs;
use crate::commands::Out;
use crate::model::{Goal, GoalDraft};
use crate::Result;

fn draft_from_args(fields: &GoalFieldArgs) -> GoalDraft {
    GoalDraft {
        name: fields.name.clone(),
        target_amount: fields.target,
        current_amount: fields.current,
    }
}

pub async fn goal_add(app: &App, fields: &GoalFieldArgs) -> Result<Out<Goal>> {
    let goal = {
        let mut records = app.records().lock().await;
        records.add_goal(draft_from_args(fields)).await?
    };
    app.flush_sync().await;
    Ok(Out::new(
        format!("Created goal '{}' (id {})", goal.name, goal.id),
        goal,
    ))
}

pub async fn goal_update(app: &App, id: i64, fields: &GoalFieldArgs) -> Result<Out<Goal>> {
    let goal = {
        let mut records = app.records().lock().await;
        records.update_goal(id, draft_from_args(fields)).await?
    };
    app.flush_sync().await;
    Ok(Out::new(
        format!(
            "Updated goal '{}': {:.1}% saved",
            goal.name,
            goal.progress_percent()
        ),
        goal,
    ))
}

pub async fn goal_delete(app: &App, id: i64) -> Result<Out<()>> {
    let removed = {
        let mut records = app.records().lock().await;
        records.delete_goal(id).await?
    };
    app.flush_sync().await;
    let message = if removed {
        format!("Deleted goal {id}")
    } else {
        format!("No goal with id {id}, nothing to delete")
    };
    Ok(Out::new_message(message))
}

pub async fn goal_list(app: &App) -> Result<Out<Vec<Goal>>> {
    let records = app.records().lock().await;
    let symbol = records.settings().currency_symbol.clone();
    let goals = records.goals().to_vec();
    drop(records);

    if goals.is_empty() {
        return Ok(Out::new("No goals yet", goals));
    }

    let mut lines = vec![format!("{} goal(s):", goals.len())];
    for goal in &goals {
        lines.push(format!(
            "  {}  {}  {} / {} {}  ({:.1}%)",
            goal.id,
            goal.name,
            goal.current_amount,
            goal.target_amount,
            symbol,
            goal.progress_percent()
        ));
    }
    Ok(Out::new(lines.join("\n"), goals))
}
