//! Implementation of the `pulse report` command.

use crate::app::App;
use crate::args::ReportArgs;
use crate::commands::Out;
use crate::model::report::{
    expenses_by_category, monthly_series, totals, for_period, MonthTotals, Totals,
};
use crate::model::Period;
use crate::Result;
use chrono::Local;
use serde::Serialize;

/// Everything the report shows, also emitted as structured output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub period: Period,
    pub totals: Totals,
    pub expense_breakdown: Vec<crate::model::report::CategoryShare>,
    pub trend: Vec<MonthTotals>,
}

pub async fn report(app: &App, args: &ReportArgs) -> Result<Out<Report>> {
    let records = app.records().lock().await;
    let symbol = records.settings().currency_symbol.clone();
    let today = Local::now().date_naive();

    let selected = for_period(records.operations(), args.period, today);
    let period_totals = totals(selected.iter().copied());
    let breakdown = expenses_by_category(selected.iter().copied());
    let trend = monthly_series(records.operations(), args.months, today);
    drop(records);

    let mut lines = vec![format!("Report for {}", args.period)];
    lines.push(format!(
        "  Balance:          {:>14} {symbol}",
        period_totals.balance.to_string()
    ));
    lines.push(format!(
        "  Income:           {:>14} {symbol}  (main {}, side {})",
        period_totals.total_income.to_string(),
        period_totals.main_income,
        period_totals.side_income
    ));
    lines.push(format!(
        "  Expenses:         {:>14} {symbol}  (personal {}, business {})",
        period_totals.total_expenses.to_string(),
        period_totals.personal_expenses,
        period_totals.business_expenses
    ));
    lines.push(format!(
        "  Side profit:      {:>14} {symbol}",
        period_totals.side_profit.to_string()
    ));

    if !breakdown.is_empty() {
        lines.push(String::new());
        lines.push("Expenses by category:".to_string());
        for row in &breakdown {
            lines.push(format!(
                "  {:<20} {:>14} {symbol}  {:>5.1}%",
                row.category,
                row.amount.to_string(),
                row.share
            ));
        }
    }

    if !trend.is_empty() {
        lines.push(String::new());
        lines.push(format!("Monthly trend ({} months):", trend.len()));
        for month in &trend {
            lines.push(format!(
                "  {:<9} income {:>14}  expenses {:>14}  side profit {:>14}",
                month.label,
                month.totals.total_income.to_string(),
                month.totals.total_expenses.to_string(),
                month.totals.side_profit.to_string()
            ));
        }
    }

    let report = Report {
        period: args.period,
        totals: period_totals,
        expense_breakdown: breakdown,
        trend,
    };
    Ok(Out::new(lines.join("\n"), report))
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

    async fn app() -> (App, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path().join("home"), None).await.unwrap();
        let app = App::open_with_store(config, Mode::Memory, Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        (app, dir)
    }

    #[tokio::test]
    async fn test_report_totals_and_breakdown() {
        let (app, _dir) = app().await;
        op_add(
            &app,
            &OpFieldArgs {
                kind: OperationType::Income,
                subtype: Subtype::Main,
                amount: Amount::from_str("1000").unwrap(),
                category: "Salary".to_string(),
                date: None,
                comment: String::new(),
                owner: Owner::Me,
            },
        )
        .await
        .unwrap();
        op_add(
            &app,
            &OpFieldArgs {
                kind: OperationType::Expense,
                subtype: Subtype::Personal,
                amount: Amount::from_str("300").unwrap(),
                category: "Groceries".to_string(),
                date: None,
                comment: String::new(),
                owner: Owner::Me,
            },
        )
        .await
        .unwrap();

        let out = report(
            &app,
            &ReportArgs {
                period: Period::CurrentMonth,
                months: 2,
            },
        )
        .await
        .unwrap();
        let r = out.structure().unwrap();
        assert_eq!(r.totals.balance, Amount::from_str("700").unwrap());
        assert_eq!(r.expense_breakdown.len(), 1);
        assert_eq!(r.expense_breakdown[0].category, "Groceries");
        assert_eq!(r.trend.len(), 2);
        assert!(out.message().contains("Report for current-month"));
    }

    #[tokio::test]
    async fn test_report_on_empty_state() {
        let (app, _dir) = app().await;
        let out = report(
            &app,
            &ReportArgs {
                period: Period::All,
                months: 0,
            },
        )
        .await
        .unwrap();
        let r = out.structure().unwrap();
        assert!(r.totals.balance.is_zero());
        assert!(r.expense_breakdown.is_empty());
        assert!(r.trend.is_empty());
    }
}
